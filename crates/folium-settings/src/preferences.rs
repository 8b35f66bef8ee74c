//! Client-side preference store.
//!
//! A flat JSON key-value file holding user display preferences (panel
//! open/closed state, chosen colors) that must survive reloading the editor.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{PreferenceError, SettingsResult};

const PANEL_PREFIX: &str = "panel.";
const COLOR_PREFIX: &str = "color.";

/// Persistent key-value store for display preferences
#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: Map<String, Value>,
    dirty: bool,
}

impl PreferenceStore {
    /// In-memory store that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`; a missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => map,
                other => {
                    return Err(PreferenceError::Corrupted(format!(
                        "expected an object, found {}",
                        json_kind(&other)
                    ))
                    .into())
                }
            }
        } else {
            Map::new()
        };
        tracing::debug!(
            "Opened preference store {} ({} entries)",
            path.display(),
            values.len()
        );
        Ok(Self {
            path: Some(path),
            values,
            dirty: false,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads a typed value. `Ok(None)` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> SettingsResult<Option<T>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| {
                    PreferenceError::TypeMismatch {
                        key: key.to_string(),
                        source,
                    }
                    .into()
                }),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SettingsResult<()> {
        let value = serde_json::to_value(value)?;
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.values.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Stored open state of a panel, if the user ever changed it
    pub fn panel_open(&self, panel: &str) -> Option<bool> {
        self.values
            .get(&format!("{PANEL_PREFIX}{panel}"))
            .and_then(Value::as_bool)
    }

    pub fn set_panel_open(&mut self, panel: &str, open: bool) {
        let key = format!("{PANEL_PREFIX}{panel}");
        if self.values.get(&key).and_then(Value::as_bool) != Some(open) {
            self.values.insert(key, Value::Bool(open));
            self.dirty = true;
        }
    }

    pub fn color(&self, role: &str) -> Option<&str> {
        self.values
            .get(&format!("{COLOR_PREFIX}{role}"))
            .and_then(Value::as_str)
    }

    pub fn set_color(&mut self, role: &str, color: &str) {
        let key = format!("{COLOR_PREFIX}{role}");
        if self.values.get(&key).and_then(Value::as_str) != Some(color) {
            self.values.insert(key, Value::String(color.to_string()));
            self.dirty = true;
        }
    }

    /// Writes the store if it changed. In-memory stores only clear the flag.
    pub fn save(&mut self) -> SettingsResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(&self.values)?;
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, content)?;
            std::fs::rename(&tmp, path)?;
            tracing::debug!("Saved preferences to {}", path.display());
        }
        self.dirty = false;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
