//! Namespaced persistent key-value settings
//!
//! Each namespace is stored as a flat JSON object in its own file under the
//! settings directory. Writes are persisted immediately.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{DeviceMcpError, Result, SettingsError};

/// A handle to one settings namespace
pub struct Settings {
    namespace: String,
    path: PathBuf,
    values: Map<String, Value>,
}

impl Settings {
    /// Open a namespace, loading existing values if the file is present
    pub fn open(root: &Path, namespace: &str) -> Result<Self> {
        let path = root.join(format!("{}.json", namespace));

        let values = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                DeviceMcpError::Settings(SettingsError::ReadFailed {
                    namespace: namespace.to_string(),
                    message: e.to_string(),
                })
            })?;
            serde_json::from_str(&text).map_err(|e| {
                DeviceMcpError::Settings(SettingsError::ReadFailed {
                    namespace: namespace.to_string(),
                    message: e.to_string(),
                })
            })?
        } else {
            Map::new()
        };

        Ok(Self {
            namespace: namespace.to_string(),
            path,
            values,
        })
    }

    /// Get a string value, falling back to `default` when absent or mistyped
    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => default.to_string(),
        }
    }

    /// Get an integer value, falling back to `default` when absent or mistyped
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).and_then(Value::as_i64).unwrap_or(default)
    }

    /// Set a string value and persist the namespace
    pub fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.values
            .insert(key.to_string(), Value::String(value.to_string()));
        self.persist()
    }

    /// Set an integer value and persist the namespace
    pub fn set_int(&mut self, key: &str, value: i64) -> Result<()> {
        self.values.insert(key.to_string(), Value::from(value));
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, text).map_err(|e| {
            DeviceMcpError::Settings(SettingsError::WriteFailed {
                namespace: self.namespace.clone(),
                message: e.to_string(),
            })
        })
    }
}
