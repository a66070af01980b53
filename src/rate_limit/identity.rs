//! Client Identity Derivation
//!
//! Derives the rate-limit key for a request from transport headers, using
//! an explicit ordered precedence list. The values are client-supplied and
//! spoofable unless the deployment's proxy layer strips or overwrites them;
//! the precedence list is configuration, not inference, so the trusted
//! boundary is always an operator decision.

use std::collections::HashMap;

/// Sentinel identity used when no identity header is present
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Derive the client identity from headers.
///
/// Headers are consulted in precedence order; the first present,
/// non-empty value wins. Comma-separated values (forwarded-for lists)
/// contribute their first entry, trimmed.
pub fn client_identity(headers: &HashMap<String, String>, precedence: &[String]) -> String {
    for header in precedence {
        if let Some(value) = headers.get(header.as_str()) {
            let first = value.split(',').next().unwrap_or("").trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    UNKNOWN_IDENTITY.to_string()
}
