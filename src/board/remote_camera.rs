//! Remote camera over HTTP
//!
//! Stands in for a hardware camera: frames come from a configured capture
//! URL and explanations from a configured explain endpoint. Configuration
//! lives in the `camera_remote` settings namespace so the
//! `self.camera.remote.set` tool and `initialize` capability negotiation
//! both feed it. All requests run on the device thread, so the blocking
//! client is safe here.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::info;

use crate::board::Camera;
use crate::error::Result;
use crate::settings::Settings;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings namespace shared with the remote-camera tools
pub const SETTINGS_NAMESPACE: &str = "camera_remote";

pub struct RemoteCamera {
    settings_dir: PathBuf,
    http: reqwest::blocking::Client,
    frame: Mutex<Vec<u8>>,
}

impl RemoteCamera {
    pub fn new(settings_dir: PathBuf) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            settings_dir,
            http,
            frame: Mutex::new(Vec::new()),
        })
    }

    fn setting(&self, key: &str) -> anyhow::Result<String> {
        let settings = Settings::open(&self.settings_dir, SETTINGS_NAMESPACE)?;
        Ok(settings.get_string(key, ""))
    }
}

impl Camera for RemoteCamera {
    fn set_explain_url(&self, url: &str, token: &str) {
        let persisted = Settings::open(&self.settings_dir, SETTINGS_NAMESPACE)
            .and_then(|mut s| {
                s.set_string("explain_url", url)?;
                s.set_string("explain_token", token)
            });
        if let Err(e) = persisted {
            tracing::warn!("Failed to store explain endpoint: {}", e);
        }
    }

    fn capture(&self) -> anyhow::Result<()> {
        let capture_url = self.setting("capture_url")?;
        if capture_url.is_empty() {
            bail!("Remote camera capture URL is not configured");
        }

        let response = self
            .http
            .get(&capture_url)
            .send()
            .with_context(|| format!("Failed to fetch {}", capture_url))?;
        if !response.status().is_success() {
            bail!("Unexpected status code: {}", response.status());
        }

        let data = response.bytes()?.to_vec();
        if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
            bail!("Invalid JPEG format");
        }

        info!("Captured {} bytes from remote camera", data.len());
        *self.frame.lock().unwrap() = data;
        Ok(())
    }

    fn explain(&self, question: &str) -> anyhow::Result<String> {
        let explain_url = self.setting("explain_url")?;
        if explain_url.is_empty() {
            bail!("Remote camera explain URL is not configured");
        }
        let token = self.setting("explain_token")?;

        let frame = self.frame.lock().unwrap().clone();
        if frame.is_empty() {
            bail!("No captured frame to explain");
        }

        let form = reqwest::blocking::multipart::Form::new()
            .text("question", question.to_string())
            .part(
                "file",
                reqwest::blocking::multipart::Part::bytes(frame)
                    .file_name("camera.jpg")
                    .mime_str("image/jpeg")?,
            );

        let mut request = self.http.post(&explain_url).multipart(form);
        if !token.is_empty() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .with_context(|| format!("Failed to reach {}", explain_url))?;
        if !response.status().is_success() {
            bail!("Unexpected status code: {}", response.status());
        }

        Ok(response.text()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_requires_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let camera = RemoteCamera::new(dir.path().to_path_buf()).unwrap();

        let err = camera.capture().unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_explain_requires_frame() {
        let dir = tempfile::tempdir().unwrap();
        let camera = RemoteCamera::new(dir.path().to_path_buf()).unwrap();
        camera.set_explain_url("http://explain.local/v1", "secret");

        let err = camera.explain("what is this?").unwrap_err();
        assert!(err.to_string().contains("No captured frame"));
    }

    #[test]
    fn test_set_explain_url_persists() {
        let dir = tempfile::tempdir().unwrap();
        let camera = RemoteCamera::new(dir.path().to_path_buf()).unwrap();
        camera.set_explain_url("http://explain.local/v1", "secret");

        let settings = Settings::open(dir.path(), SETTINGS_NAMESPACE).unwrap();
        assert_eq!(
            settings.get_string("explain_url", ""),
            "http://explain.local/v1"
        );
        assert_eq!(settings.get_string("explain_token", ""), "secret");
    }
}
