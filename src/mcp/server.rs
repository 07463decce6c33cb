//! MCP server: message routing and tool dispatch
//!
//! Parses inbound JSON-RPC envelopes, routes the three supported methods,
//! and schedules tool handlers onto the device execution context. All
//! replies leave through the transport; malformed envelopes that carry no
//! usable id are logged and dropped because nothing can be addressed back.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, warn};

use crate::board::remote_camera::SETTINGS_NAMESPACE;
use crate::board::Camera;
use crate::config::{server, Config};
use crate::error::{DeviceMcpError, McpError, Result};
use crate::executor::DeviceExecutor;
use crate::mcp::registry::ToolRegistry;
use crate::mcp::types::{
    methods, CallToolResult, InitializeResult, JsonRpcResponse, ListToolsResult,
    ServerCapabilities, ServerInfo, JSONRPC_VERSION, MCP_VERSION,
};
use crate::settings::Settings;
use crate::transport::Transport;

/// MCP server for a device board
///
/// Holds the read-only tool registry, the handle to the device execution
/// thread, and the reply transport. The message path (`handle_message`) is
/// non-blocking: parsing, routing, enumeration, and argument binding run
/// inline; handler execution is deferred to the device context.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    executor: DeviceExecutor,
    transport: Arc<dyn Transport>,
    camera: Option<Arc<dyn Camera>>,
    settings_dir: PathBuf,
    server_name: String,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(
        registry: Arc<ToolRegistry>,
        executor: DeviceExecutor,
        transport: Arc<dyn Transport>,
        camera: Option<Arc<dyn Camera>>,
        config: &Config,
    ) -> Self {
        Self {
            registry,
            executor,
            transport,
            camera,
            settings_dir: config.settings_dir.clone(),
            server_name: config.server_name.clone(),
        }
    }

    /// Run the server on stdio
    pub async fn run_stdio(&self) -> Result<()> {
        self.run(BufReader::new(tokio::io::stdin())).await
    }

    /// Run the server over any line-delimited reader
    pub async fn run<R>(&self, reader: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.handle_message(line);
        }
        Ok(())
    }

    /// Handle one inbound message
    ///
    /// Never returns an error to the caller: every failure either becomes
    /// an error reply on the transport or, for unanswerable envelopes, a
    /// log line.
    pub fn handle_message(&self, raw: &str) {
        let json: Value = match serde_json::from_str(raw) {
            Ok(json) => json,
            Err(_) => {
                error!("Failed to parse MCP message: {}", raw);
                return;
            }
        };

        // Envelope validation precedes all routing.
        match json.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            other => {
                error!("Invalid JSONRPC version: {:?}", other);
                return;
            }
        }

        let Some(method) = json.get("method").and_then(Value::as_str) else {
            error!("Missing method");
            return;
        };

        if method.starts_with(methods::NOTIFICATION_PREFIX) {
            return;
        }

        let params = match json.get("params") {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                error!("Invalid params for method: {}", method);
                return;
            }
        };

        // Without a numeric id no reply can be addressed; drop with a log.
        let Some(id) = json.get("id").and_then(Value::as_i64) else {
            error!("Invalid id for method: {}", method);
            return;
        };

        match method {
            methods::INITIALIZE => self.handle_initialize(id, params),
            methods::LIST_TOOLS => self.handle_tools_list(id, params),
            methods::CALL_TOOL => self.handle_tools_call(id, params),
            _ => {
                error!("Method not implemented: {}", method);
                self.reply_error(
                    id,
                    McpError::MethodNotImplemented {
                        method: method.to_string(),
                    }
                    .to_string(),
                );
            }
        }
    }

    /// Handle `initialize`: capability negotiation plus server identity
    fn handle_initialize(&self, id: i64, params: Option<&Map<String, Value>>) {
        if let Some(capabilities) = params
            .and_then(|p| p.get("capabilities"))
            .and_then(Value::as_object)
        {
            self.parse_capabilities(capabilities);
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: server::VERSION.to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(value) => self.reply_result(id, value),
            Err(e) => self.reply_error(id, e.to_string()),
        }
    }

    /// Route announced client capabilities to their collaborators
    ///
    /// The vision capability carries the explain endpoint. It goes to the
    /// hardware camera when one exists; otherwise it is persisted for the
    /// remote camera to pick up.
    fn parse_capabilities(&self, capabilities: &Map<String, Value>) {
        let Some(vision) = capabilities.get("vision").and_then(Value::as_object) else {
            return;
        };
        let Some(url) = vision.get("url").and_then(Value::as_str) else {
            return;
        };
        let token = vision.get("token").and_then(Value::as_str).unwrap_or("");

        if let Some(camera) = &self.camera {
            camera.set_explain_url(url, token);
            return;
        }

        let persisted = Settings::open(&self.settings_dir, SETTINGS_NAMESPACE).and_then(|mut s| {
            s.set_string("explain_url", url)?;
            s.set_string("explain_token", token)
        });
        if let Err(e) = persisted {
            warn!("Failed to persist vision capability: {}", e);
        }
    }

    /// Handle `tools/list`
    fn handle_tools_list(&self, id: i64, params: Option<&Map<String, Value>>) {
        let cursor = params
            .and_then(|p| p.get("cursor"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let with_user_tools = params
            .and_then(|p| p.get("withUserTools"))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let page = match self.registry.list(cursor, with_user_tools) {
            Ok(page) => page,
            Err(e) => {
                error!("tools/list: {}", e);
                self.reply_error(id, error_message(&e));
                return;
            }
        };

        let result = ListToolsResult {
            tools: page.tools,
            next_cursor: page.next_cursor,
        };
        match serde_json::to_value(result) {
            Ok(value) => self.reply_result(id, value),
            Err(e) => self.reply_error(id, e.to_string()),
        }
    }

    /// Handle `tools/call`: validate, bind, then defer to the device thread
    fn handle_tools_call(&self, id: i64, params: Option<&Map<String, Value>>) {
        let Some(params) = params else {
            error!("tools/call: Missing params");
            self.reply_error(id, McpError::MissingParams.to_string());
            return;
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            error!("tools/call: Missing name");
            self.reply_error(id, McpError::MissingName.to_string());
            return;
        };
        let arguments = match params.get("arguments") {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                error!("tools/call: Invalid arguments");
                self.reply_error(id, McpError::InvalidArguments.to_string());
                return;
            }
        };

        let Some(tool) = self.registry.find(name) else {
            error!("tools/call: Unknown tool: {}", name);
            self.reply_error(
                id,
                McpError::UnknownTool {
                    name: name.to_string(),
                }
                .to_string(),
            );
            return;
        };

        let bound = match tool.schema().bind(arguments) {
            Ok(bound) => bound,
            Err(e) => {
                error!("tools/call: {}", e);
                self.reply_error(id, e.to_string());
                return;
            }
        };

        // The bound clone moves into the job wholesale; nothing aliases the
        // request after this point.
        let handler = tool.handler();
        let transport = self.transport.clone();
        let scheduled = self.executor.schedule(move || {
            let response = match handler(&bound) {
                Ok(value) => match serde_json::to_value(CallToolResult::from(value)) {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => JsonRpcResponse::failure(id, e.to_string()),
                },
                Err(e) => {
                    error!("tools/call: {}", e);
                    JsonRpcResponse::failure(id, e.to_string())
                }
            };
            deliver(transport.as_ref(), &response);
        });

        if scheduled.is_err() {
            self.reply_error(id, McpError::ExecutorUnavailable.to_string());
        }
    }

    fn reply_result(&self, id: i64, result: Value) {
        deliver(
            self.transport.as_ref(),
            &JsonRpcResponse::success(id, result),
        );
    }

    fn reply_error(&self, id: i64, message: String) {
        deliver(
            self.transport.as_ref(),
            &JsonRpcResponse::failure(id, message),
        );
    }
}

/// Encode a reply and push it to the transport
fn deliver(transport: &dyn Transport, response: &JsonRpcResponse) {
    let payload = match serde_json::to_string(response) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode reply for id {}: {}", response.id, e);
            return;
        }
    };
    if let Err(e) = transport.send(&payload) {
        error!("Failed to send reply for id {}: {}", response.id, e);
    }
}

/// Wire-visible message for an internal error
///
/// The top-level error type prefixes its source ("MCP protocol error: ...");
/// remote callers get the inner message alone.
fn error_message(err: &DeviceMcpError) -> String {
    match err {
        DeviceMcpError::Mcp(inner) => inner.to_string(),
        other => other.to_string(),
    }
}
