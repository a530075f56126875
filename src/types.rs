//! Common types used throughout cursor-harvest
//!
//! Shared type aliases and small enums used across multiple modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A provider record. Opaque apart from the identity fields.
pub type Record = JsonValue;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
        }
    }
}

// ============================================================================
// Termination
// ============================================================================

/// Why a walk stopped without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Provider returned no next cursor
    NoCursor,
    /// Provider handed back a cursor already consumed this session
    CursorRepeat,
    /// Caller-supplied result ceiling reached
    MaxResults,
}

impl TerminationReason {
    /// Wire name used in logs and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoCursor => "no_cursor",
            Self::CursorRepeat => "cursor_repeat",
            Self::MaxResults => "max_results",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
