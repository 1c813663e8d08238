//! Configuration system tests
//!
//! Tests for config paths and streamlight config loading/saving.

use streamlight::config::StreamlightConfig;
use streamlight::config_paths;
use streamlight::session::StreamOptions;

// ========================================================================
// Config Paths Tests
// ========================================================================

#[test]
fn test_config_dir_returns_some() {
    assert!(config_paths::config_dir().is_some());
}

#[test]
fn test_config_dir_contains_app_name() {
    let dir = config_paths::config_dir().unwrap();
    assert!(dir.to_string_lossy().contains("streamlight"));
}

#[test]
fn test_config_file_ends_with_yaml() {
    let path = config_paths::config_file().unwrap();
    assert!(path.to_string_lossy().ends_with("config.yaml"));
}

#[test]
fn test_themes_and_logs_are_subdirs_of_config() {
    let config = config_paths::config_dir().unwrap();
    assert!(config_paths::themes_dir().unwrap().starts_with(&config));
    assert!(config_paths::logs_dir().unwrap().starts_with(&config));
}

// ========================================================================
// Streamlight Config Tests
// ========================================================================

#[test]
fn test_default_config() {
    let config = StreamlightConfig::default();
    assert_eq!(config.theme, "github-dark");
    assert_eq!(config.language, "text");
    assert!(config.allow_recalls);
    assert_eq!(config.request_timeout_secs, 30);
}

#[test]
fn test_config_serialize_deserialize() {
    let config = StreamlightConfig {
        theme: "github-light".to_string(),
        language: "go".to_string(),
        allow_recalls: false,
        ..StreamlightConfig::default()
    };

    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: StreamlightConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_config_uses_defaults() {
    let parsed: StreamlightConfig = serde_yaml::from_str("language: rust\n").unwrap();
    assert_eq!(parsed.language, "rust");
    assert_eq!(parsed.theme, "github-dark");
    assert_eq!(parsed.endpoint, "http://127.0.0.1:3000");
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.yaml");

    let config = StreamlightConfig {
        endpoint: "http://highlight.internal:8080".to_string(),
        request_timeout_secs: 5,
        ..StreamlightConfig::default()
    };
    config.save_to(&path).unwrap();

    assert_eq!(StreamlightConfig::load_from(&path), config);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = StreamlightConfig::load_from(&dir.path().join("absent.yaml"));
    assert_eq!(loaded, StreamlightConfig::default());
}

#[test]
fn test_malformed_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "allow_recalls: [not a bool").unwrap();
    assert_eq!(StreamlightConfig::load_from(&path), StreamlightConfig::default());
}

#[test]
fn test_stream_options_from_config() {
    let config = StreamlightConfig {
        language: "python".to_string(),
        allow_recalls: false,
        ..StreamlightConfig::default()
    };
    let options = StreamOptions::from_config(&config);
    assert_eq!(options.language_name(), "python");
    assert_eq!(options.theme_id(), "github-dark");
    assert!(!options.allow_recalls);
}
