//! Error types for greeting-mcp

use serde::{Deserialize, Serialize};

/// Boxed error used at process boundaries (binary entry point, serve loop).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// JSON-RPC error codes used by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    /// The method (or tool) does not exist / is not available
    MethodNotFound = -32601,
    /// Internal JSON-RPC error
    InternalError = -32603,
    /// Server-defined: the access token lacks a scope the tool requires
    InsufficientScope = -32001,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn tool_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound, "Tool not found")
    }

    pub fn tool_not_registered() -> Self {
        Self::new(ErrorCode::MethodNotFound, "Tool not registered")
    }

    pub fn insufficient_scope(missing: &[String]) -> Self {
        Self::new(ErrorCode::InsufficientScope, "Insufficient scope")
            .with_data(serde_json::json!({ "required": missing }))
    }

    /// The one internal error clients ever see. Details stay in the logs.
    pub fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError, "Internal error")
    }

    /// Whether this error is a transport-level failure (HTTP 500) rather than
    /// an application error carried inside a 200 response.
    pub fn is_internal(&self) -> bool {
        self.code == ErrorCode::InternalError.code()
    }
}

/// greeting-mcp error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    pub fn tool(message: impl Into<String>) -> Self {
        Error::Tool(message.into())
    }
}

/// Result type alias for greeting-mcp
pub type Result<T> = std::result::Result<T, Error>;
