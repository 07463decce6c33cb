//! Tool registration for board capabilities
//!
//! Wires board accessors into the tool registry. Common tools are spliced
//! in front of anything a board registered earlier: the first page of
//! `tools/list` is the one a remote controller's prompt cache keeps warm,
//! so the everyday tools belong there.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use serde_json::json;

use crate::board::remote_camera::{RemoteCamera, SETTINGS_NAMESPACE};
use crate::board::{Board, Camera};
use crate::error::Result;
use crate::mcp::property::{Property, PropertyList};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tool::{McpTool, ReturnValue};
use crate::settings::Settings;

/// Register the common tool set, in front of any tools already present
pub fn register_common_tools(
    registry: &mut ToolRegistry,
    board: &Arc<Board>,
    settings_dir: &Path,
) -> Result<()> {
    // Back up board-specific tools and re-add them after the common set.
    let board_tools = registry.drain();

    {
        let board = board.clone();
        registry.add_tool(McpTool::new(
            "self.get_device_status",
            "Provides the real-time information of the device, including the current status of \
             the audio speaker, screen, battery, network, etc.\n\
             Use this tool for: \n\
             1. Answering questions about current condition (e.g. what is the current volume of \
             the audio speaker?)\n\
             2. As the first step to control the device (e.g. turn up / down the volume of the \
             audio speaker, etc.)",
            PropertyList::new(),
            move |_| Ok(ReturnValue::Json(board.device_status())),
        ));
    }

    if let Some(codec) = board.audio() {
        registry.add_tool(McpTool::new(
            "self.audio_speaker.set_volume",
            "Set the volume of the audio speaker. If the current volume is unknown, you must \
             call `self.get_device_status` tool first and then call this tool.",
            PropertyList::from_properties(vec![Property::bounded_integer("volume", 0, 100)]),
            move |properties| {
                let volume = properties.integer("volume")? as u8;
                codec.set_output_volume(volume)?;
                Ok(true.into())
            },
        ));
    }

    if let Some(backlight) = board.backlight() {
        registry.add_tool(McpTool::new(
            "self.screen.set_brightness",
            "Set the brightness of the screen.",
            PropertyList::from_properties(vec![Property::bounded_integer("brightness", 0, 100)]),
            move |properties| {
                let brightness = properties.integer("brightness")? as u8;
                backlight.set_brightness(brightness)?;
                Ok(true.into())
            },
        ));
    }

    if let Some(display) = board.display() {
        registry.add_tool(McpTool::new(
            "self.screen.set_theme",
            "Set the theme of the screen. The theme can be `light` or `dark`.",
            PropertyList::from_properties(vec![Property::string("theme")]),
            move |properties| {
                let theme = properties.string("theme")?;
                let applied = display.set_theme(theme)?;
                Ok(applied.into())
            },
        ));
    }

    // A remote camera instance backs the photo tools whenever the board has
    // no hardware camera of its own.
    let remote = Arc::new(RemoteCamera::new(settings_dir.to_path_buf())?);

    let photo_camera: Arc<dyn Camera> = match board.camera() {
        Some(camera) => camera,
        None => remote.clone(),
    };
    registry.add_tool(McpTool::new(
        "self.camera.take_photo",
        "Take a photo and explain it. Use this tool after the user asks you to see something.\n\
         Args:\n\
         \x20 `question`: The question that you want to ask about the photo.\n\
         Return:\n\
         \x20 A JSON object that provides the photo information.",
        PropertyList::from_properties(vec![Property::string("question")]),
        move |properties| {
            photo_camera.capture()?;
            let question = properties.string("question")?;
            Ok(ReturnValue::Text(photo_camera.explain(question)?))
        },
    ));

    {
        let settings_dir = settings_dir.to_path_buf();
        registry.add_tool(McpTool::new(
            "self.camera.remote.set",
            "Configure remote camera parameters.\nArgs:\n\
             \x20 `capture_url`: The URL to GET the camera image from.\n\
             \x20 `explain_url`: The URL to send image explain requests to.\n\
             \x20 `token`: Optional bearer token for explain server.",
            PropertyList::from_properties(vec![
                Property::string("capture_url"),
                Property::string("explain_url"),
                Property::string_with_default("token", ""),
            ]),
            move |properties| {
                let mut settings = Settings::open(&settings_dir, SETTINGS_NAMESPACE)?;
                settings.set_string("capture_url", properties.string("capture_url")?)?;
                settings.set_string("explain_url", properties.string("explain_url")?)?;
                settings.set_string("explain_token", properties.string("token")?)?;
                Ok(true.into())
            },
        ));
    }

    {
        let settings_dir = settings_dir.to_path_buf();
        registry.add_tool(McpTool::new(
            "self.camera.remote.get",
            "Get remote camera configuration.",
            PropertyList::new(),
            move |_| {
                let settings = Settings::open(&settings_dir, SETTINGS_NAMESPACE)?;
                Ok(ReturnValue::Json(json!({
                    "capture_url": settings.get_string("capture_url", ""),
                    "explain_url": settings.get_string("explain_url", ""),
                    "explain_token": settings.get_string("explain_token", ""),
                })))
            },
        ));
    }

    registry.add_tool(McpTool::new(
        "self.camera.take_photo_remote",
        "Take a photo from configured remote camera and explain it. Args:\n\
         \x20 `question`: question for the AI analysis.",
        PropertyList::from_properties(vec![Property::string("question")]),
        move |properties| {
            remote.capture()?;
            let question = properties.string("question")?;
            Ok(ReturnValue::Text(remote.explain(question)?))
        },
    ));

    for tool in board_tools {
        registry.add_tool(tool);
    }

    Ok(())
}

/// Register the user-only tool set
pub fn register_user_only_tools(registry: &mut ToolRegistry, board: &Arc<Board>) -> Result<()> {
    {
        let system = board.system();
        registry.add_tool(
            McpTool::new(
                "self.get_system_info",
                "Get the system information",
                PropertyList::new(),
                move |_| Ok(ReturnValue::Json(system.system_info())),
            )
            .user_only(),
        );
    }

    {
        let system = board.system();
        registry.add_tool(
            McpTool::new(
                "self.reboot",
                "Reboot the system",
                PropertyList::new(),
                move |_| {
                    system.reboot()?;
                    Ok(true.into())
                },
            )
            .user_only(),
        );
    }

    {
        let system = board.system();
        registry.add_tool(
            McpTool::new(
                "self.upgrade_firmware",
                "Upgrade firmware from a specific URL. This will download and install the \
                 firmware, then reboot the device.",
                PropertyList::from_properties(vec![Property::string("url")]),
                move |properties| {
                    system.upgrade_firmware(properties.string("url")?)?;
                    Ok(true.into())
                },
            )
            .user_only(),
        );
    }

    if let Some(display) = board.display() {
        registry.add_tool(
            McpTool::new(
                "self.screen.get_info",
                "Information about the screen, including width, height, etc.",
                PropertyList::new(),
                {
                    let display = display.clone();
                    move |_| {
                        Ok(ReturnValue::Json(json!({
                            "width": display.width(),
                            "height": display.height(),
                            "monochrome": display.monochrome(),
                        })))
                    }
                },
            )
            .user_only(),
        );

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        registry.add_tool(
            McpTool::new(
                "self.screen.snapshot",
                "Snapshot the screen and upload it to a specific URL",
                PropertyList::from_properties(vec![
                    Property::string("url"),
                    Property::bounded_integer_with_default("quality", 80, 1, 100),
                ]),
                move |properties| {
                    let url = properties.string("url")?;
                    let quality = properties.integer("quality")? as u8;

                    let jpeg = display.snapshot_jpeg(quality)?;
                    upload_snapshot(&http, url, jpeg)?;
                    Ok(true.into())
                },
            )
            .user_only(),
        );
    }

    Ok(())
}

/// Upload a screen snapshot as multipart form data
fn upload_snapshot(
    http: &reqwest::blocking::Client,
    url: &str,
    jpeg: Vec<u8>,
) -> anyhow::Result<()> {
    let size = jpeg.len();
    let form = reqwest::blocking::multipart::Form::new().part(
        "file",
        reqwest::blocking::multipart::Part::bytes(jpeg)
            .file_name("screenshot.jpg")
            .mime_str("image/jpeg")?,
    );

    let response = http
        .post(url)
        .multipart(form)
        .send()
        .with_context(|| format!("Failed to open URL: {}", url))?;
    if !response.status().is_success() {
        bail!("Unexpected status code: {}", response.status());
    }

    tracing::info!("Uploaded snapshot {} bytes to {}", size, url);
    Ok(())
}

/// Convenience used by the binary: build the registry for a board
pub fn build_registry(board: &Arc<Board>, settings_dir: &Path) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_common_tools(&mut registry, board, settings_dir)?;
    register_user_only_tools(&mut registry, board)?;
    Ok(registry)
}
