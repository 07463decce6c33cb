//! Board accessors
//!
//! The server core never touches hardware directly; it sees the board as a
//! set of capability traits, each optionally absent. A missing capability
//! simply means the corresponding tools are not registered.

pub mod remote_camera;
pub mod simulated;
pub mod tools;

use std::sync::Arc;

use serde_json::{json, Value};

/// Speaker codec accessor
pub trait AudioCodec: Send + Sync {
    fn output_volume(&self) -> u8;
    fn set_output_volume(&self, volume: u8) -> anyhow::Result<()>;
}

/// Screen backlight accessor
pub trait Backlight: Send + Sync {
    fn brightness(&self) -> u8;
    fn set_brightness(&self, brightness: u8) -> anyhow::Result<()>;
}

/// Display panel accessor
pub trait DisplayPanel: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn monochrome(&self) -> bool;
    fn theme(&self) -> String;

    /// Switch themes; returns false when the theme name is unknown
    fn set_theme(&self, theme: &str) -> anyhow::Result<bool>;

    /// Render the current screen contents as a JPEG
    fn snapshot_jpeg(&self, quality: u8) -> anyhow::Result<Vec<u8>>;
}

/// Battery gauge accessor
pub trait Battery: Send + Sync {
    fn level(&self) -> u8;
    fn charging(&self) -> bool;
}

/// Visual capture collaborator
///
/// Implemented by a hardware camera when the board has one, or by
/// [`remote_camera::RemoteCamera`] otherwise.
pub trait Camera: Send + Sync {
    /// Store the explain endpoint announced during capability negotiation
    fn set_explain_url(&self, url: &str, token: &str);

    /// Capture a frame, keeping it for a following explain
    fn capture(&self) -> anyhow::Result<()>;

    /// Send the captured frame and a question to the explain endpoint,
    /// returning the endpoint's JSON reply text
    fn explain(&self, question: &str) -> anyhow::Result<String>;
}

/// Reboot and firmware upgrade collaborator
pub trait SystemControl: Send + Sync {
    fn reboot(&self) -> anyhow::Result<()>;
    fn upgrade_firmware(&self, url: &str) -> anyhow::Result<()>;
    fn system_info(&self) -> Value;
}

/// A device board: a name plus its available capabilities
pub struct Board {
    name: String,
    audio: Option<Arc<dyn AudioCodec>>,
    backlight: Option<Arc<dyn Backlight>>,
    display: Option<Arc<dyn DisplayPanel>>,
    battery: Option<Arc<dyn Battery>>,
    camera: Option<Arc<dyn Camera>>,
    system: Arc<dyn SystemControl>,
}

impl Board {
    pub fn new(name: impl Into<String>, system: Arc<dyn SystemControl>) -> Self {
        Self {
            name: name.into(),
            audio: None,
            backlight: None,
            display: None,
            battery: None,
            camera: None,
            system,
        }
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioCodec>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_backlight(mut self, backlight: Arc<dyn Backlight>) -> Self {
        self.backlight = Some(backlight);
        self
    }

    pub fn with_display(mut self, display: Arc<dyn DisplayPanel>) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_battery(mut self, battery: Arc<dyn Battery>) -> Self {
        self.battery = Some(battery);
        self
    }

    pub fn with_camera(mut self, camera: Arc<dyn Camera>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn audio(&self) -> Option<Arc<dyn AudioCodec>> {
        self.audio.clone()
    }

    pub fn backlight(&self) -> Option<Arc<dyn Backlight>> {
        self.backlight.clone()
    }

    pub fn display(&self) -> Option<Arc<dyn DisplayPanel>> {
        self.display.clone()
    }

    pub fn battery(&self) -> Option<Arc<dyn Battery>> {
        self.battery.clone()
    }

    pub fn camera(&self) -> Option<Arc<dyn Camera>> {
        self.camera.clone()
    }

    pub fn system(&self) -> Arc<dyn SystemControl> {
        self.system.clone()
    }

    /// Real-time status document served by `self.get_device_status`
    pub fn device_status(&self) -> Value {
        let mut status = serde_json::Map::new();
        status.insert("board".to_string(), json!(self.name));

        if let Some(audio) = &self.audio {
            status.insert(
                "audio_speaker".to_string(),
                json!({"volume": audio.output_volume()}),
            );
        }
        if let Some(display) = &self.display {
            let mut screen = serde_json::Map::new();
            screen.insert("theme".to_string(), json!(display.theme()));
            if let Some(backlight) = &self.backlight {
                screen.insert("brightness".to_string(), json!(backlight.brightness()));
            }
            status.insert("screen".to_string(), Value::Object(screen));
        }
        if let Some(battery) = &self.battery {
            status.insert(
                "battery".to_string(),
                json!({"level": battery.level(), "charging": battery.charging()}),
            );
        }

        Value::Object(status)
    }
}

#[cfg(test)]
mod board_tests {
    use super::simulated;
    use super::*;

    #[test]
    fn test_device_status_reflects_capabilities() {
        let board = simulated::simulated_board("test-board");
        let status = board.device_status();

        assert_eq!(status["board"], "test-board");
        assert!(status["audio_speaker"]["volume"].is_number());
        assert!(status["screen"]["brightness"].is_number());
        assert!(status["battery"]["level"].is_number());
    }

    #[test]
    fn test_device_status_omits_absent_capabilities() {
        let board = Board::new("bare", Arc::new(simulated::SimulatedSystem::default()));
        let status = board.device_status();

        assert!(status.get("audio_speaker").is_none());
        assert!(status.get("screen").is_none());
        assert!(status.get("battery").is_none());
    }
}
