//! Schema Field Metadata
//!
//! The static field/type facts the estimator needs from the schema: which
//! fields are list-typed. Declared once at startup by whatever owns the
//! schema; the estimator only reads it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for a single schema field
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FieldMeta {
    /// True when the field's declared type is a list type
    pub is_list: bool,
}

/// Field metadata table for the schema, keyed by field name.
///
/// Fields absent from the table are treated as plain (non-list) fields, so
/// an empty table is a valid, conservative default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaMeta {
    fields: HashMap<String, FieldMeta>,
}

impl SchemaMeta {
    /// Create an empty metadata table
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a list-typed field
    pub fn list_field(mut self, name: &str) -> Self {
        self.fields
            .insert(name.to_string(), FieldMeta { is_list: true });
        self
    }

    /// Declare a plain field explicitly
    pub fn plain_field(mut self, name: &str) -> Self {
        self.fields
            .insert(name.to_string(), FieldMeta { is_list: false });
        self
    }

    /// Whether the named field is list-typed; unknown fields are not
    pub fn is_list(&self, name: &str) -> bool {
        self.fields.get(name).map(|meta| meta.is_list).unwrap_or(false)
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
