//! Simulated board
//!
//! In-memory implementations of the board accessor traits, used by the
//! binary when no real hardware integration is linked in and by tests.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::board::{AudioCodec, Backlight, Battery, Board, DisplayPanel, SystemControl};

const THEMES: &[&str] = &["light", "dark"];

/// Speaker with a volume register
pub struct SimulatedAudio {
    volume: AtomicU8,
}

impl Default for SimulatedAudio {
    fn default() -> Self {
        Self {
            volume: AtomicU8::new(70),
        }
    }
}

impl AudioCodec for SimulatedAudio {
    fn output_volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    fn set_output_volume(&self, volume: u8) -> anyhow::Result<()> {
        self.volume.store(volume, Ordering::Relaxed);
        Ok(())
    }
}

/// Backlight with a brightness register
pub struct SimulatedBacklight {
    brightness: AtomicU8,
}

impl Default for SimulatedBacklight {
    fn default() -> Self {
        Self {
            brightness: AtomicU8::new(100),
        }
    }
}

impl Backlight for SimulatedBacklight {
    fn brightness(&self) -> u8 {
        self.brightness.load(Ordering::Relaxed)
    }

    fn set_brightness(&self, brightness: u8) -> anyhow::Result<()> {
        self.brightness.store(brightness, Ordering::Relaxed);
        Ok(())
    }
}

/// Fixed-size color panel with a switchable theme
pub struct SimulatedDisplay {
    width: u32,
    height: u32,
    theme: Mutex<String>,
}

impl Default for SimulatedDisplay {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            theme: Mutex::new("light".to_string()),
        }
    }
}

impl DisplayPanel for SimulatedDisplay {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn monochrome(&self) -> bool {
        false
    }

    fn theme(&self) -> String {
        self.theme.lock().unwrap().clone()
    }

    fn set_theme(&self, theme: &str) -> anyhow::Result<bool> {
        if !THEMES.contains(&theme) {
            return Ok(false);
        }
        *self.theme.lock().unwrap() = theme.to_string();
        Ok(true)
    }

    fn snapshot_jpeg(&self, quality: u8) -> anyhow::Result<Vec<u8>> {
        info!("Snapshot requested at quality {}", quality);
        // A minimal valid JPEG stream: SOI marker, no scan data, EOI marker.
        Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }
}

/// Battery gauge pinned at a full charge
pub struct SimulatedBattery {
    level: AtomicU8,
    charging: AtomicBool,
}

impl Default for SimulatedBattery {
    fn default() -> Self {
        Self {
            level: AtomicU8::new(100),
            charging: AtomicBool::new(false),
        }
    }
}

impl Battery for SimulatedBattery {
    fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    fn charging(&self) -> bool {
        self.charging.load(Ordering::Relaxed)
    }
}

/// System control that records requests instead of acting on them
#[derive(Default)]
pub struct SimulatedSystem;

impl SystemControl for SimulatedSystem {
    fn reboot(&self) -> anyhow::Result<()> {
        warn!("User requested reboot");
        Ok(())
    }

    fn upgrade_firmware(&self, url: &str) -> anyhow::Result<()> {
        info!("User requested firmware upgrade from URL: {}", url);
        Ok(())
    }

    fn system_info(&self) -> Value {
        json!({
            "version": crate::config::server::VERSION,
            "arch": std::env::consts::ARCH,
            "os": std::env::consts::OS,
        })
    }
}

/// Assemble a fully-equipped simulated board
pub fn simulated_board(name: &str) -> Board {
    Board::new(name, Arc::new(SimulatedSystem))
        .with_audio(Arc::new(SimulatedAudio::default()))
        .with_backlight(Arc::new(SimulatedBacklight::default()))
        .with_display(Arc::new(SimulatedDisplay::default()))
        .with_battery(Arc::new(SimulatedBattery::default()))
}
