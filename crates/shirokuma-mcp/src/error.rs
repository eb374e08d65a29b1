//! Wire-format error envelope (§6/§7).
//!
//! Core entry points return `shirokuma_core::CoreError`; this is the one
//! translation point from that error into the `{code, message, details?}`
//! envelope carried as the `data` payload of a JSON-RPC error object.

use serde::Serialize;
use shirokuma_core::CoreError;

#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ToolError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<CoreError> for ToolError {
    fn from(e: CoreError) -> Self {
        let message = e.to_string();
        match e {
            CoreError::InvalidType(_) => ToolError::new("InvalidType", message),
            CoreError::InvalidPriority(_) => ToolError::new("InvalidPriority", message),
            CoreError::InvalidDate(_) => ToolError::new("InvalidDate", message),
            CoreError::UnknownStatus(_) => ToolError::new("UnknownStatus", message),
            CoreError::UnknownItem(_) => ToolError::new("UnknownItem", message),
            CoreError::NotFound(_) => ToolError::new("NotFound", message),
            CoreError::EmbeddingDimMismatch { .. } => ToolError::new("EmbeddingDimMismatch", message),
            CoreError::Timeout => ToolError::new("Timeout", message),
            CoreError::ConflictingRelation(_) => ToolError::new("ConflictingRelation", message),
            CoreError::Conflict(_) => ToolError::new("Conflict", message),
            _ => ToolError::new("StorageError", message),
        }
    }
}

pub type ToolResult = Result<serde_json::Value, ToolError>;

impl From<CoreError> for crate::protocol::types::JsonRpcError {
    fn from(e: CoreError) -> Self {
        crate::protocol::types::JsonRpcError::tool_error(ToolError::from(e))
    }
}

