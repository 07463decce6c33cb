//! Integration tests for the Device MCP Server
//!
//! These tests drive the server through `handle_message` with a capturing
//! transport, verifying protocol handling, argument binding, pagination,
//! and the serialized execution of tool handlers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use device_mcp_server::config::Config;
use device_mcp_server::executor::DeviceExecutor;
use device_mcp_server::mcp::property::{Property, PropertyList};
use device_mcp_server::mcp::registry::ToolRegistry;
use device_mcp_server::mcp::server::McpServer;
use device_mcp_server::mcp::tool::{McpTool, ReturnValue};
use device_mcp_server::settings::Settings;
use device_mcp_server::transport::Transport;

/// Transport that records replies with their arrival time
#[derive(Default)]
struct CaptureTransport {
    messages: Mutex<Vec<(Instant, Value)>>,
}

impl Transport for CaptureTransport {
    fn send(&self, payload: &str) -> device_mcp_server::Result<()> {
        let value = serde_json::from_str(payload).expect("reply must be valid JSON");
        self.messages.lock().unwrap().push((Instant::now(), value));
        Ok(())
    }
}

impl CaptureTransport {
    /// Wait until at least `count` replies have arrived
    fn wait_for(&self, count: usize) -> Vec<(Instant, Value)> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            {
                let messages = self.messages.lock().unwrap();
                if messages.len() >= count {
                    return messages.clone();
                }
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {} replies",
                count
            );
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn snapshot(&self) -> Vec<Value> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, v)| v.clone())
            .collect()
    }
}

struct TestServer {
    server: McpServer,
    transport: Arc<CaptureTransport>,
    settings_dir: tempfile::TempDir,
}

impl TestServer {
    fn new(registry: ToolRegistry) -> Self {
        let settings_dir = tempfile::tempdir().unwrap();
        let config =
            Config::with_settings_dir("test-board", settings_dir.path().to_path_buf()).unwrap();
        let transport = Arc::new(CaptureTransport::default());
        let server = McpServer::new(
            Arc::new(registry),
            DeviceExecutor::start(),
            transport.clone(),
            None,
            &config,
        );
        Self {
            server,
            transport,
            settings_dir,
        }
    }

    fn send(&self, message: Value) {
        self.server.handle_message(&message.to_string());
    }

    fn call(&self, id: i64, name: &str, arguments: Value) {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments},
        }));
    }
}

fn echo_registry() -> (ToolRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut registry = ToolRegistry::new();
    registry.add_tool(McpTool::new(
        "echo",
        "Echo the message back",
        PropertyList::from_properties(vec![Property::string("msg")]),
        move |properties| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ReturnValue::Text(properties.string("msg")?.to_string()))
        },
    ));
    (registry, calls)
}

mod protocol_tests {
    use super::*;

    #[test]
    fn test_initialize_reply() {
        let fixture = TestServer::new(ToolRegistry::new());
        fixture.send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"capabilities": {}},
        }));

        let replies = fixture.transport.wait_for(1);
        let reply = &replies[0].1;
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
        assert!(reply["result"]["capabilities"]["tools"].is_object());
        assert_eq!(reply["result"]["serverInfo"]["name"], "test-board");
    }

    #[test]
    fn test_initialize_persists_vision_capability() {
        let fixture = TestServer::new(ToolRegistry::new());
        fixture.send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "capabilities": {
                    "vision": {"url": "http://explain.local/v1", "token": "secret"}
                }
            },
        }));
        fixture.transport.wait_for(1);

        let settings = Settings::open(fixture.settings_dir.path(), "camera_remote").unwrap();
        assert_eq!(
            settings.get_string("explain_url", ""),
            "http://explain.local/v1"
        );
        assert_eq!(settings.get_string("explain_token", ""), "secret");
    }

    #[test]
    fn test_initialize_without_id_is_dropped() {
        let fixture = TestServer::new(ToolRegistry::new());
        fixture.send(json!({
            "jsonrpc": "2.0",
            "method": "initialize",
        }));

        std::thread::sleep(Duration::from_millis(50));
        assert!(fixture.transport.snapshot().is_empty());
    }

    #[test]
    fn test_malformed_envelopes_are_dropped() {
        let fixture = TestServer::new(ToolRegistry::new());

        // Wrong version, missing method, string id, non-object params.
        fixture.send(json!({"jsonrpc": "1.0", "id": 1, "method": "tools/list"}));
        fixture.send(json!({"jsonrpc": "2.0", "id": 2}));
        fixture.send(json!({"jsonrpc": "2.0", "id": "three", "method": "tools/list"}));
        fixture.send(json!({"jsonrpc": "2.0", "id": 4, "method": "tools/list", "params": 7}));
        fixture.server.handle_message("not json at all");

        std::thread::sleep(Duration::from_millis(50));
        assert!(fixture.transport.snapshot().is_empty());
    }

    #[test]
    fn test_notifications_are_silently_dropped() {
        let fixture = TestServer::new(ToolRegistry::new());
        fixture.send(json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized",
        }));

        std::thread::sleep(Duration::from_millis(50));
        assert!(fixture.transport.snapshot().is_empty());
    }

    #[test]
    fn test_unknown_method_is_not_implemented() {
        let fixture = TestServer::new(ToolRegistry::new());
        fixture.send(json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "resources/list",
        }));

        let replies = fixture.transport.wait_for(1);
        assert_eq!(
            replies[0].1["error"]["message"],
            "Method not implemented: resources/list"
        );
    }
}

mod tool_call_tests {
    use super::*;

    #[test]
    fn test_echo_round_trip() {
        let (registry, _) = echo_registry();
        let fixture = TestServer::new(registry);

        fixture.call(1, "echo", json!({"msg": "hi"}));

        let replies = fixture.transport.wait_for(1);
        let reply = &replies[0].1;
        assert_eq!(reply["id"], 1);
        assert_eq!(reply["result"]["content"][0]["type"], "text");
        assert_eq!(reply["result"]["content"][0]["text"], "hi");
    }

    #[test]
    fn test_missing_argument_never_reaches_handler() {
        let (registry, calls) = echo_registry();
        let fixture = TestServer::new(registry);

        fixture.call(2, "echo", json!({}));

        let replies = fixture.transport.wait_for(1);
        assert_eq!(
            replies[0].1["error"]["message"],
            "Missing valid argument: msg"
        );

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_tool() {
        let fixture = TestServer::new(ToolRegistry::new());
        fixture.call(3, "no.such.tool", json!({}));

        let replies = fixture.transport.wait_for(1);
        assert_eq!(
            replies[0].1["error"]["message"],
            "Unknown tool: no.such.tool"
        );
    }

    #[test]
    fn test_param_validation_errors() {
        let fixture = TestServer::new(ToolRegistry::new());

        fixture.send(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call"}));
        fixture.send(json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": {"arguments": {}},
        }));
        fixture.send(json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": {"name": "echo", "arguments": [1, 2]},
        }));

        let replies = fixture.transport.wait_for(3);
        assert_eq!(replies[0].1["error"]["message"], "Missing params");
        assert_eq!(replies[1].1["error"]["message"], "Missing name");
        assert_eq!(replies[2].1["error"]["message"], "Invalid arguments");
    }

    #[test]
    fn test_defaults_and_overrides_reach_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();

        let mut registry = ToolRegistry::new();
        registry.add_tool(McpTool::new(
            "configure",
            "Record the bound arguments",
            PropertyList::from_properties(vec![
                Property::string("mode"),
                Property::bounded_integer_with_default("level", 5, 0, 10),
            ]),
            move |properties| {
                record.lock().unwrap().push((
                    properties.string("mode")?.to_string(),
                    properties.integer("level")?,
                ));
                Ok(true.into())
            },
        ));
        let fixture = TestServer::new(registry);

        fixture.call(1, "configure", json!({"mode": "eco"}));
        fixture.call(2, "configure", json!({"mode": "fast", "level": 9}));
        // Out of range: the caller value is ignored and the default stands.
        fixture.call(3, "configure", json!({"mode": "fast", "level": 42}));

        fixture.transport.wait_for(3);
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("eco".to_string(), 5),
                ("fast".to_string(), 9),
                ("fast".to_string(), 5),
            ]
        );
    }

    #[test]
    fn test_handler_error_becomes_error_reply() {
        let mut registry = ToolRegistry::new();
        registry.add_tool(McpTool::new(
            "faulty",
            "Always fails",
            PropertyList::new(),
            |_| anyhow::bail!("Failed to capture photo"),
        ));
        let fixture = TestServer::new(registry);

        fixture.call(4, "faulty", json!({}));

        let replies = fixture.transport.wait_for(1);
        assert_eq!(replies[0].1["error"]["message"], "Failed to capture photo");
    }

    #[test]
    fn test_duplicate_registration_keeps_first_handler() {
        let mut registry = ToolRegistry::new();
        registry.add_tool(McpTool::new("dup", "first", PropertyList::new(), |_| {
            Ok("first".into())
        }));
        registry.add_tool(McpTool::new("dup", "second", PropertyList::new(), |_| {
            Ok("second".into())
        }));
        let fixture = TestServer::new(registry);

        fixture.call(5, "dup", json!({}));

        let replies = fixture.transport.wait_for(1);
        assert_eq!(replies[0].1["result"]["content"][0]["text"], "first");
    }

    #[test]
    fn test_calls_serialize_on_device_context() {
        let mut registry = ToolRegistry::new();
        registry.add_tool(McpTool::new(
            "slow",
            "Sleep for a while",
            PropertyList::new(),
            |_| {
                std::thread::sleep(Duration::from_millis(100));
                Ok(true.into())
            },
        ));
        let fixture = TestServer::new(registry);

        fixture.call(10, "slow", json!({}));
        fixture.call(11, "slow", json!({}));

        let replies = fixture.transport.wait_for(2);
        assert_eq!(replies[0].1["id"], 10);
        assert_eq!(replies[1].1["id"], 11);

        let gap = replies[1].0.duration_since(replies[0].0);
        assert!(
            gap >= Duration::from_millis(100),
            "replies only {:?} apart; handlers overlapped",
            gap
        );
    }
}

mod listing_tests {
    use super::*;

    fn listing_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        let filler = "d".repeat(1000);
        for i in 0..12 {
            let mut tool = McpTool::new(
                format!("self.tool{:02}", i),
                filler.clone(),
                PropertyList::new(),
                |_| Ok(true.into()),
            );
            // Every third tool is user-only.
            if i % 3 == 0 {
                tool = tool.user_only();
            }
            registry.add_tool(tool);
        }
        registry
    }

    fn collect_pages(fixture: &TestServer, with_user_tools: bool) -> (Vec<String>, usize) {
        let mut names = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        let mut id = 100;

        loop {
            let mut params = json!({"withUserTools": with_user_tools});
            if let Some(c) = &cursor {
                params["cursor"] = json!(c);
            }
            fixture.send(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/list",
                "params": params,
            }));

            let replies = fixture.transport.wait_for((id - 99) as usize);
            let reply = &replies[(id - 100) as usize].1;
            pages += 1;
            for tool in reply["result"]["tools"].as_array().unwrap() {
                names.push(tool["name"].as_str().unwrap().to_string());
            }
            match reply["result"]["nextCursor"].as_str() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
            id += 1;
        }
        (names, pages)
    }

    #[test]
    fn test_pagination_covers_every_tool_exactly_once() {
        let fixture = TestServer::new(listing_registry());

        let (names, pages) = collect_pages(&fixture, true);
        assert!(pages > 1, "expected the payload budget to force pagination");

        let expected: Vec<String> = (0..12).map(|i| format!("self.tool{:02}", i)).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_user_only_tools_require_opt_in() {
        let fixture = TestServer::new(listing_registry());

        let (names, _) = collect_pages(&fixture, false);
        let expected: Vec<String> = (0..12)
            .filter(|i| i % 3 != 0)
            .map(|i| format!("self.tool{:02}", i))
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_unknown_cursor_yields_empty_final_page() {
        let fixture = TestServer::new(listing_registry());
        fixture.send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list",
            "params": {"cursor": "self.removed"},
        }));

        let replies = fixture.transport.wait_for(1);
        let result = &replies[0].1["result"];
        assert!(result["tools"].as_array().unwrap().is_empty());
        assert!(result.get("nextCursor").is_none());
    }

    #[test]
    fn test_oversize_tool_is_a_listing_error() {
        let mut registry = ToolRegistry::new();
        registry.add_tool(McpTool::new(
            "self.big",
            "d".repeat(9000),
            PropertyList::new(),
            |_| Ok(true.into()),
        ));
        let fixture = TestServer::new(registry);

        fixture.send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list",
        }));

        let replies = fixture.transport.wait_for(1);
        assert_eq!(
            replies[0].1["error"]["message"],
            "Failed to add tool self.big because of payload size limit"
        );
    }

    #[test]
    fn test_page_bodies_stay_under_budget() {
        let fixture = TestServer::new(listing_registry());
        fixture.send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/list",
            "params": {"withUserTools": true},
        }));

        let replies = fixture.transport.wait_for(1);
        let body = serde_json::to_string(&replies[0].1["result"]).unwrap();
        assert!(body.len() <= 8000, "page body is {} bytes", body.len());
    }
}

mod run_loop_tests {
    use super::*;

    #[test]
    fn test_run_handles_line_delimited_input() {
        let (registry, _) = echo_registry();
        let fixture = TestServer::new(registry);

        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",",
            "\"params\":{\"name\":\"echo\",\"arguments\":{\"msg\":\"hello\"}}}\n",
        );

        tokio_test::block_on(fixture.server.run(input.as_bytes())).unwrap();

        let replies = fixture.transport.wait_for(2);
        assert_eq!(replies[0].1["id"], 1);
        assert_eq!(replies[1].1["result"]["content"][0]["text"], "hello");
    }
}
