//! Tests for configuration loading and graceful degradation
//!
//! Tests that manipulate REVLENS_ROOT_FOLDER or REVLENS_ROOT are marked with #[serial]
//! so they do not race on process environment.

use revlens_common::config::{
    load_toml_config, write_toml_config, CompiledDefaults, LoggingConfig, RootFolderInitializer,
    RootFolderResolver, TomlConfig,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_root_env() {
    env::remove_var("REVLENS_ROOT_FOLDER");
    env::remove_var("REVLENS_ROOT");
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.log_file.is_none());
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    clear_root_env();

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_cli_arg_has_highest_priority() {
    env::set_var("REVLENS_ROOT_FOLDER", "/tmp/revlens-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/revlens-toml")),
        ..Default::default()
    };

    let root_folder = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/revlens-cli")))
        .with_toml(&toml)
        .resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/revlens-cli"));
    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_env_beats_toml() {
    clear_root_env();
    env::set_var("REVLENS_ROOT", "/tmp/revlens-env-root");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/revlens-toml")),
        ..Default::default()
    };

    let root_folder = RootFolderResolver::new("test-module").with_toml(&toml).resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/revlens-env-root"));
    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_root_folder_env_takes_precedence() {
    clear_root_env();
    env::set_var("REVLENS_ROOT_FOLDER", "/tmp/revlens-priority-1");
    env::set_var("REVLENS_ROOT", "/tmp/revlens-priority-2");

    let root_folder = RootFolderResolver::new("test-module").resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/revlens-priority-1"));
    clear_root_env();
}

#[test]
#[serial]
fn test_resolver_falls_back_to_toml() {
    clear_root_env();
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/revlens-toml")),
        ..Default::default()
    };

    let root_folder = RootFolderResolver::new("test-module").with_toml(&toml).resolve();

    assert_eq!(root_folder, PathBuf::from("/tmp/revlens-toml"));
}

#[test]
fn test_missing_config_file_does_not_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let config = load_toml_config(&path).unwrap();

    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_malformed_config_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "port = [not valid").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_write_then_load_preserves_fields() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("revlens-analyzer.toml");

    let mut config = TomlConfig {
        root_folder: Some(PathBuf::from("/data/revlens")),
        port: Some(8000),
        logging: LoggingConfig {
            level: "debug".to_string(),
            file: None,
        },
        ..Default::default()
    };
    config.openai.api_key = Some("sk-test".to_string());

    write_toml_config(&config, &path).unwrap();
    assert!(!path.with_extension("toml.tmp").exists());

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded.root_folder, Some(PathBuf::from("/data/revlens")));
    assert_eq!(loaded.port, Some(8000));
    assert_eq!(loaded.logging.level, "debug");
    assert_eq!(loaded.openai.api_key.as_deref(), Some("sk-test"));
}

#[test]
fn test_pipeline_table_is_kept_raw() {
    let config: TomlConfig = toml::from_str(
        r#"
        [pipeline]
        max_concurrent_batches = 4
        aspect_batch_size = 10
        "#,
    )
    .unwrap();

    let table = config.pipeline.expect("pipeline table should be present");
    assert_eq!(
        table.get("max_concurrent_batches").and_then(|v| v.as_integer()),
        Some(4)
    );
}

#[test]
fn test_initializer_creates_directory_idempotently() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert!(initializer.ensure_directory_exists().is_ok());
    assert!(initializer.ensure_directory_exists().is_ok());
    assert!(root.is_dir());
    assert_eq!(initializer.feedback_log_path(), root.join("feedback_store.jsonl"));
    assert_eq!(initializer.checkpoint_dir(), root.join("checkpoints"));
    assert_eq!(initializer.reviews_dir(), root.join("reviews"));
}
