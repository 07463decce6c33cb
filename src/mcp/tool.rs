//! Tool model
//!
//! A tool is a named, described, schema-bound callable with a visibility
//! tier. Handlers run on the device execution thread and may block; they
//! report failures through `anyhow` and the scheduler boundary turns those
//! into RPC error replies.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::mcp::property::PropertyList;
use crate::mcp::types::{CallToolResult, ToolDescription};

/// Value produced by a tool handler
///
/// A closed union: each case has its own wire encoding, all of them carried
/// as the text content of a `tools/call` result.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    Bool(bool),
    Text(String),
    Json(Value),
}

impl From<bool> for ReturnValue {
    fn from(value: bool) -> Self {
        ReturnValue::Bool(value)
    }
}

impl From<String> for ReturnValue {
    fn from(value: String) -> Self {
        ReturnValue::Text(value)
    }
}

impl From<&str> for ReturnValue {
    fn from(value: &str) -> Self {
        ReturnValue::Text(value.to_string())
    }
}

impl From<Value> for ReturnValue {
    fn from(value: Value) -> Self {
        ReturnValue::Json(value)
    }
}

impl From<ReturnValue> for CallToolResult {
    fn from(value: ReturnValue) -> Self {
        match value {
            ReturnValue::Bool(b) => CallToolResult::text(if b { "true" } else { "false" }),
            ReturnValue::Text(s) => CallToolResult::text(s),
            ReturnValue::Json(v) => CallToolResult::text(v.to_string()),
        }
    }
}

/// Visibility tier of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolVisibility {
    /// Listed by default
    Public,
    /// Listed only when `tools/list` asks for user tools
    UserOnly,
}

/// Handler callback type
pub type ToolHandler = Arc<dyn Fn(&PropertyList) -> anyhow::Result<ReturnValue> + Send + Sync>;

/// A registered device capability
pub struct McpTool {
    name: String,
    description: String,
    schema: PropertyList,
    visibility: ToolVisibility,
    handler: ToolHandler,
}

impl McpTool {
    /// Create a public tool
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: PropertyList,
        handler: F,
    ) -> Self
    where
        F: Fn(&PropertyList) -> anyhow::Result<ReturnValue> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            visibility: ToolVisibility::Public,
            handler: Arc::new(handler),
        }
    }

    /// Restrict the tool to user-only listing
    pub fn user_only(mut self) -> Self {
        self.visibility = ToolVisibility::UserOnly;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &PropertyList {
        &self.schema
    }

    pub fn is_user_only(&self) -> bool {
        self.visibility == ToolVisibility::UserOnly
    }

    /// Clone a handle to the handler for scheduling
    pub fn handler(&self) -> ToolHandler {
        self.handler.clone()
    }

    /// Schema entry for `tools/list`
    pub fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.schema.input_schema(),
        }
    }
}

impl fmt::Debug for McpTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpTool")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("properties", &self.schema.len())
            .finish()
    }
}
