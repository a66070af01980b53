//! Query Executor Seam
//!
//! The external query-execution engine is an excluded collaborator: the
//! pipeline invokes it through this trait only when no governance hook has
//! short-circuited the request. Execution failures are reported in-band as
//! an error list on the reply, never as a Rust error, so every failure
//! stays per-request and isolated.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::request::{Document, ResponseError};

/// The request as handed to the executor, after source resolution.
///
/// `query` is the text the engine should execute; when the governance layer
/// substituted stored persisted-query text for a hash-only request,
/// `was_substituted` is set and `query` carries the stored text.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    /// Id of the originating request
    pub request_id: Uuid,

    /// Query text to execute, after any persisted-query substitution
    pub query: Option<String>,

    /// Operation name, when declared
    pub operation_name: Option<String>,

    /// Operation variables
    pub variables: Option<Value>,

    /// Parsed selection tree, when the transport provided one
    pub document: Option<Document>,

    /// True when `query` came from the persisted-query registry
    pub was_substituted: bool,
}

/// Reply from the execution engine
#[derive(Debug, Clone, Default)]
pub struct ExecutorReply {
    /// Result data, when execution produced any
    pub data: Option<Value>,

    /// Execution-phase errors; non-empty replies are never cached
    pub errors: Vec<ResponseError>,
}

impl ExecutorReply {
    /// Create a successful reply carrying data
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// Create a failed reply carrying a single error
    pub fn failed(error: ResponseError) -> Self {
        Self {
            data: None,
            errors: vec![error],
        }
    }
}

/// The external query-execution engine
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a resolved request and report the outcome in-band
    async fn execute(&self, request: &ResolvedRequest) -> ExecutorReply;
}
