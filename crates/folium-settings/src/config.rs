//! Configuration management for Folium
//!
//! Configuration is organized into logical sections:
//! - Viewport limits and gesture factors
//! - Segmentation editor tolerances
//! - Remote synchronization timeouts
//! - UI defaults (reading direction, panels, colors)
//!
//! Files may be JSON or TOML, selected by extension.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SettingsResult};

/// Text reading direction of the document being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadDirection {
    #[default]
    Ltr,
    Rtl,
}

impl std::fmt::Display for ReadDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ltr => write!(f, "ltr"),
            Self::Rtl => write!(f, "rtl"),
        }
    }
}

/// Viewport transform limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Smallest allowed scale factor
    pub min_scale: f64,
    /// Largest allowed scale factor
    pub max_scale: f64,
    /// Scale restored by a reset
    pub initial_scale: f64,
    /// Relative scale change per wheel notch (> 1)
    pub wheel_factor: f64,
    /// Inactivity before the overview indicator fades out
    pub map_fade_ms: u64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 10.0,
            initial_scale: 1.0,
            wheel_factor: 1.1,
            map_fade_ms: 1500,
        }
    }
}

/// Segmentation editor tolerances, in screen pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Radius within which a vertex or stroke counts as hit
    pub hit_tolerance_px: f64,
    /// Curve simplification tolerance applied after a drawing gesture
    pub simplify_tolerance_px: f64,
    /// Smallest width/height of a drawn region, smaller drags are discarded
    pub min_region_size_px: f64,
    /// Vertical distance of the delete-point control above its vertex
    pub delete_control_offset_px: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            hit_tolerance_px: 6.0,
            simplify_tolerance_px: 2.0,
            min_region_size_px: 5.0,
            delete_control_offset_px: 20.0,
        }
    }
}

/// Remote synchronization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Per-request timeout
    pub request_timeout_ms: u64,
    /// Largest image accepted by the upload queue
    pub max_upload_size_bytes: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            max_upload_size_bytes: 150 * 1024 * 1024,
        }
    }
}

/// UI defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Reading direction used when the embedding page does not supply one
    pub read_direction: ReadDirection,
    /// Default open state per panel name
    pub panel_visibility: HashMap<String, bool>,
    /// Default colors by role (e.g. "baseline", "mask", "region")
    pub colors: HashMap<String, String>,
}

impl Default for UiSettings {
    fn default() -> Self {
        let mut panel_visibility = HashMap::new();
        panel_visibility.insert("source".to_string(), false);
        panel_visibility.insert("segmentation".to_string(), true);
        panel_visibility.insert("transcription".to_string(), true);

        let mut colors = HashMap::new();
        colors.insert("baseline".to_string(), "#0000ff".to_string());
        colors.insert("mask".to_string(), "#9932cc".to_string());
        colors.insert("region".to_string(), "#028700".to_string());

        Self {
            read_direction: ReadDirection::Ltr,
            panel_visibility,
            colors,
        }
    }
}

/// Complete editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub viewport: ViewportSettings,
    pub editor: EditorSettings,
    pub sync: SyncSettings,
    pub ui: UiSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location: `<config dir>/folium/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDirectory)?;
        Ok(dir.join("folium").join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)?;
        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };
        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the config at `path`, falling back to defaults when it is missing
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        tracing::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let vp = &self.viewport;
        if vp.min_scale <= 0.0 {
            return Err(out_of_range("viewport.min_scale", vp.min_scale));
        }
        if vp.max_scale < vp.min_scale {
            return Err(out_of_range("viewport.max_scale", vp.max_scale));
        }
        if vp.initial_scale < vp.min_scale || vp.initial_scale > vp.max_scale {
            return Err(out_of_range("viewport.initial_scale", vp.initial_scale));
        }
        if vp.wheel_factor <= 1.0 {
            return Err(out_of_range("viewport.wheel_factor", vp.wheel_factor));
        }

        let ed = &self.editor;
        if ed.hit_tolerance_px <= 0.0 {
            return Err(out_of_range("editor.hit_tolerance_px", ed.hit_tolerance_px));
        }
        if ed.simplify_tolerance_px < 0.0 {
            return Err(out_of_range(
                "editor.simplify_tolerance_px",
                ed.simplify_tolerance_px,
            ));
        }
        if ed.min_region_size_px < 0.0 {
            return Err(out_of_range(
                "editor.min_region_size_px",
                ed.min_region_size_px,
            ));
        }

        if self.sync.request_timeout_ms == 0 {
            return Err(out_of_range("sync.request_timeout_ms", 0));
        }
        Ok(())
    }
}

fn out_of_range(key: &str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}
