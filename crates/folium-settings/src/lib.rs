//! Folium Settings Crate
//!
//! Handles editor configuration files and the client-side preference store
//! that outlives a single page load.

pub mod config;
pub mod error;
pub mod preferences;

pub use config::{
    Config, EditorSettings, ReadDirection, SyncSettings, UiSettings, ViewportSettings,
};
pub use error::{ConfigError, PreferenceError, SettingsError, SettingsResult};
pub use preferences::PreferenceStore;
