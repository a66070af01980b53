//! Request and Response Data Model
//!
//! Types shared across the governance pipeline: the parsed selection tree
//! (produced by an external parser/validator), the inbound request
//! descriptor, and the outbound response shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// A parsed operation document: the root selection set plus the document's
/// fragment definitions, keyed by fragment name.
///
/// Fragments are defined once per document and may be referenced from any
/// number of spread sites. The document is immutable after parse and owned
/// by the request.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Root selection set of the operation
    pub selections: Vec<Selection>,

    /// Fragment name -> fragment definition
    pub fragments: HashMap<String, Fragment>,
}

impl Document {
    /// Create a document from a root selection set with no fragments
    pub fn new(selections: Vec<Selection>) -> Self {
        Self {
            selections,
            fragments: HashMap::new(),
        }
    }

    /// Add a named fragment definition
    pub fn with_fragment(mut self, name: &str, fragment: Fragment) -> Self {
        self.fragments.insert(name.to_string(), fragment);
        self
    }
}

/// A named fragment definition
#[derive(Debug, Clone)]
pub struct Fragment {
    /// The fragment's selection set
    pub selections: Vec<Selection>,
}

impl Fragment {
    /// Create a fragment from a selection set
    pub fn new(selections: Vec<Selection>) -> Self {
        Self { selections }
    }
}

/// One node of a selection tree
#[derive(Debug, Clone)]
pub enum Selection {
    /// A concrete field selection
    Field {
        /// Field name as written in the query
        name: String,

        /// Argument bag attached to the field
        arguments: Vec<Argument>,

        /// Nested selections; empty for scalar leaves
        children: Vec<Selection>,
    },

    /// An inline fragment contributing its selections at the parent depth
    InlineFragment {
        /// The fragment's selection set
        selections: Vec<Selection>,
    },

    /// A reference to a named fragment, resolved against the document
    FragmentSpread {
        /// Name of the referenced fragment
        name: String,
    },
}

impl Selection {
    /// Create a scalar leaf field selection
    pub fn field(name: &str) -> Self {
        Selection::Field {
            name: name.to_string(),
            arguments: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a field selection with nested children
    pub fn object(name: &str, children: Vec<Selection>) -> Self {
        Selection::Field {
            name: name.to_string(),
            arguments: Vec::new(),
            children,
        }
    }

    /// Create a fragment spread referencing a named fragment
    pub fn spread(name: &str) -> Self {
        Selection::FragmentSpread {
            name: name.to_string(),
        }
    }

    /// Create an inline fragment
    pub fn inline(selections: Vec<Selection>) -> Self {
        Selection::InlineFragment { selections }
    }
}

/// A field argument: name plus an opaque JSON value
#[derive(Debug, Clone)]
pub struct Argument {
    /// Argument name
    pub name: String,

    /// Argument value
    pub value: Value,
}

/// Wire-level request extensions recognized by the governance layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestExtensions {
    /// APQ persisted-query extension, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted_query: Option<PersistedQueryExtension>,
}

/// The APQ extension object: `persistedQuery: {version, sha256Hash}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQueryExtension {
    /// Protocol version; only version 1 is recognized
    pub version: u32,

    /// Content hash of the registered query text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_hash: Option<String>,
}

/// An inbound request as seen by the governance pipeline.
///
/// Parsing and validation happen outside this crate; when the transport has
/// already parsed the query, `document` carries the selection tree. The
/// `read_only` marker is set at the transport boundary for operations known
/// to be free of side effects; how that is determined is out of scope here.
#[derive(Debug, Clone)]
pub struct GovernanceRequest {
    /// Unique request id
    pub id: Uuid,

    /// Transport headers, lowercase keys
    pub headers: HashMap<String, String>,

    /// Full query text, when the client sent one
    pub query: Option<String>,

    /// Operation name, when declared
    pub operation_name: Option<String>,

    /// Operation variables
    pub variables: Option<Value>,

    /// Recognized request extensions
    pub extensions: Option<RequestExtensions>,

    /// Parsed selection tree, when available
    pub document: Option<Document>,

    /// True for operations marked non-mutating at the transport boundary
    pub read_only: bool,
}

impl GovernanceRequest {
    /// Create an empty request descriptor
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            headers: HashMap::new(),
            query: None,
            operation_name: None,
            variables: None,
            extensions: None,
            document: None,
            read_only: false,
        }
    }

    /// Set the raw query text
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    /// Set the operation name
    pub fn with_operation_name(mut self, name: &str) -> Self {
        self.operation_name = Some(name.to_string());
        self
    }

    /// Set the operation variables
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Attach the parsed selection tree
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Mark the operation as read-only (cacheable)
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Set a transport header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    /// Attach an APQ persisted-query extension
    pub fn with_persisted_query(mut self, extension: PersistedQueryExtension) -> Self {
        self.extensions = Some(RequestExtensions {
            persisted_query: Some(extension),
        });
        self
    }

    /// The APQ extension, when the request carries one
    pub fn persisted_query(&self) -> Option<&PersistedQueryExtension> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.persisted_query.as_ref())
    }
}

impl Default for GovernanceRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Error bucket used when an error carries no extension code
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN";

/// One error in a response's error list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    /// Human-readable message
    pub message: String,

    /// Machine-readable extension payload; `code` identifies the category
    #[serde(default)]
    pub extensions: serde_json::Map<String, Value>,
}

impl ResponseError {
    /// Create an error with a message and no extensions
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            extensions: serde_json::Map::new(),
        }
    }

    /// Create an error with a message and a machine-readable code
    pub fn with_code(message: &str, code: &str) -> Self {
        let mut extensions = serde_json::Map::new();
        extensions.insert("code".to_string(), Value::String(code.to_string()));
        Self {
            message: message.to_string(),
            extensions,
        }
    }

    /// The error's extension code, or the `UNKNOWN` bucket when absent
    pub fn code(&self) -> &str {
        self.extensions
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_ERROR_CODE)
    }
}

/// The outbound response produced by the pipeline
#[derive(Debug, Clone, Default)]
pub struct GovernanceResponse {
    /// Result data; `None` when the request was rejected or failed outright
    pub data: Option<Value>,

    /// Error list; empty on success
    pub errors: Vec<ResponseError>,

    /// Response headers set by governance hooks, lowercase keys
    pub headers: HashMap<String, String>,
}

impl GovernanceResponse {
    /// Create a successful response carrying data
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            headers: HashMap::new(),
        }
    }

    /// Create a failed response carrying a single error
    pub fn from_error(error: ResponseError) -> Self {
        Self {
            data: None,
            errors: vec![error],
            headers: HashMap::new(),
        }
    }

    /// True when the error list is empty
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
