//! Round trips of configuration and preferences through the filesystem

use folium_settings::{Config, PreferenceStore, ReadDirection};
use tempfile::tempdir;

#[test]
fn test_config_toml_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.viewport.max_scale = 6.0;
    config.ui.read_direction = ReadDirection::Rtl;
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.editor.hit_tolerance_px = 9.0;
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded.editor.hit_tolerance_px, 9.0);
}

#[test]
fn test_invalid_file_is_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[viewport]\nmin_scale = 0.0\n").unwrap();

    assert!(Config::load_from_file(&path).is_err());
}

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_preferences_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("preferences.json");

    let mut store = PreferenceStore::open(&path).unwrap();
    store.set_panel_open("source", true);
    store.set_color("mask", "#123456");
    store.save().unwrap();

    let reopened = PreferenceStore::open(&path).unwrap();
    assert_eq!(reopened.panel_open("source"), Some(true));
    assert_eq!(reopened.color("mask"), Some("#123456"));
}

#[test]
fn test_corrupted_preferences_are_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("preferences.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let err = PreferenceStore::open(&path).unwrap_err();
    assert!(err.to_string().contains("an array"));
}
