//! Error types for the Device MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Device MCP Server
#[derive(Error, Debug)]
pub enum DeviceMcpError {
    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Settings store errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// MCP protocol errors
///
/// The `Display` strings double as the wire-visible `error.message` text,
/// so changing them changes what remote callers see.
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Missing params")]
    MissingParams,

    #[error("Missing name")]
    MissingName,

    #[error("Invalid arguments")]
    InvalidArguments,

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Missing valid argument: {name}")]
    MissingArgument { name: String },

    #[error("Unknown property: {name}")]
    UnknownProperty { name: String },

    #[error("Property {name} is not bound to a value")]
    UnboundProperty { name: String },

    #[error("Property {name} has type {expected}, not {requested}")]
    PropertyTypeMismatch {
        name: String,
        expected: &'static str,
        requested: &'static str,
    },

    #[error("Failed to add tool {name} because of payload size limit")]
    PayloadOverflow { name: String },

    #[error("Method not implemented: {method}")]
    MethodNotImplemented { method: String },

    #[error("Device executor unavailable")]
    ExecutorUnavailable,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create settings directory: {path}")]
    DirCreationFailed { path: String },
}

/// Settings store errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings namespace {namespace}: {message}")]
    ReadFailed { namespace: String, message: String },

    #[error("Failed to persist settings namespace {namespace}: {message}")]
    WriteFailed { namespace: String, message: String },
}

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to deliver message: {message}")]
    SendFailed { message: String },
}

/// Result type alias for Device MCP operations
pub type Result<T> = std::result::Result<T, DeviceMcpError>;
