//! Tool registry and paginated enumeration
//!
//! Tools are kept in registration order; that order is also the listing
//! order, so tools registered first land in the first page a remote cache
//! keeps resident. Registration happens during board bring-up, before the
//! message path is live; afterwards the registry is read-only.

use tracing::{info, warn};

use crate::error::{McpError, Result};
use crate::mcp::tool::McpTool;
use crate::mcp::types::ToolDescription;

/// Upper bound on the serialized body of one `tools/list` page
const MAX_PAYLOAD_SIZE: usize = 8000;

/// Slack for the envelope wrapper and an optional nextCursor field
const RESPONSE_SLACK: usize = 30;

/// One page of tool schemas
#[derive(Debug)]
pub struct ToolPage {
    pub tools: Vec<ToolDescription>,
    /// Name of the first omitted tool, when the page was truncated
    pub next_cursor: Option<String>,
}

/// Ordered collection of tools, deduplicated by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<McpTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; on a name conflict the first registration wins
    pub fn add_tool(&mut self, tool: McpTool) {
        if self.tools.iter().any(|t| t.name() == tool.name()) {
            warn!("Tool {} already added", tool.name());
            return;
        }
        info!(
            "Add tool: {}{}",
            tool.name(),
            if tool.is_user_only() { " [user]" } else { "" }
        );
        self.tools.push(tool);
    }

    /// Look up a tool by name
    pub fn find(&self, name: &str) -> Option<&McpTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Remove and return all registered tools, preserving order
    ///
    /// Used during bring-up to splice common tools in front of tools a
    /// board registered earlier.
    pub fn drain(&mut self) -> Vec<McpTool> {
        std::mem::take(&mut self.tools)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Enumerate one page of tool schemas
    ///
    /// `cursor` names the first tool of the page (empty = from the start);
    /// an unknown cursor yields an empty final page. User-only tools are
    /// skipped unless `with_user_tools` is set. Entries accumulate until
    /// the next one would push the serialized body past the payload limit;
    /// the page then stops and reports that tool's name as the cursor for
    /// the next page. A page that cannot fit even one entry is an error:
    /// the caller must always be able to make progress.
    pub fn list(&self, cursor: &str, with_user_tools: bool) -> Result<ToolPage> {
        let mut found_cursor = cursor.is_empty();
        let mut used = "{\"tools\":[".len();
        let mut tools = Vec::new();
        let mut next_cursor = None;

        for tool in &self.tools {
            if !found_cursor {
                if tool.name() == cursor {
                    found_cursor = true;
                } else {
                    continue;
                }
            }

            if !with_user_tools && tool.is_user_only() {
                continue;
            }

            let entry = tool.describe();
            let entry_len = serde_json::to_string(&entry)?.len() + 1;
            if used + entry_len + RESPONSE_SLACK > MAX_PAYLOAD_SIZE {
                next_cursor = Some(tool.name().to_string());
                break;
            }

            used += entry_len;
            tools.push(entry);
        }

        if tools.is_empty() {
            if let Some(name) = next_cursor {
                return Err(McpError::PayloadOverflow { name }.into());
            }
        }

        Ok(ToolPage { tools, next_cursor })
    }
}
