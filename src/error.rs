//! Error types for the MCP gateway.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// MCP gateway errors.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON-RPC protocol error.
    #[error("JSON-RPC error: {code} - {message}")]
    JsonRpc {
        /// Error code.
        code: i32,
        /// Error message.
        message: String,
        /// Additional data.
        data: Option<serde_json::Value>,
    },

    /// Tool not found in the registry.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Two tools registered under the same name. Fatal at startup.
    #[error("tool name conflict: {name} (existing: {existing}, attempted: {attempted})")]
    NameConflict {
        /// The contested tool name.
        name: String,
        /// Source of the descriptor already registered.
        existing: String,
        /// Source of the descriptor that attempted to register.
        attempted: String,
    },

    /// Provider mount failure (spawn, handshake, or discovery). Fatal at startup.
    #[error("mount failed for '{namespace}': {message}")]
    Mount {
        /// Namespace the provider was being mounted under.
        namespace: String,
        /// What went wrong.
        message: String,
    },

    /// Invalid parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The proxied transport returned an error or became unreachable.
    #[error("upstream error from '{tool}': {message}")]
    Upstream {
        /// The proxied tool that failed.
        tool: String,
        /// Error reported by the upstream transport.
        message: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::JsonRpc { code, .. } => *code,
            Error::ToolNotFound(_) => -32601,   // Method not found
            Error::NameConflict { .. } => -32603,
            Error::Mount { .. } => -32603,
            Error::InvalidParams(_) => -32602,  // Invalid params
            Error::Upstream { .. } => -32001,
            Error::Serialization(_) => -32700,  // Parse error
            Error::Io(_) => -32002,
            Error::Internal(_) => -32603,       // Internal error
        }
    }

    /// Convert to JSON-RPC error response.
    pub fn to_json_rpc_error(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

/// Standard JSON-RPC error codes.
pub mod codes {
    /// Parse error.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i32 = -32603;
}
