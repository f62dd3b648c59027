//! Tests for configuration loading and root folder resolution
//!
//! Tests that manipulate RAASTA_ROOT_FOLDER are marked #[serial] so they do not race
//! on the process environment.

use raasta_common::config::{
    database_path, default_root_folder, photos_dir, read_toml_config, resolve_root_folder,
    TomlConfig,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use uuid::Uuid;

const ENV_VAR: &str = "RAASTA_ROOT_FOLDER";

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ENV_VAR, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some("/tmp/from-toml".into()),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some("/tmp/from-cli"), ENV_VAR, Some(&toml));
    assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var(ENV_VAR, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some("/tmp/from-toml".into()),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, ENV_VAR, Some(&toml));
    assert_eq!(resolved, PathBuf::from("/tmp/from-env"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ENV_VAR);
    let toml = TomlConfig {
        root_folder: Some("/tmp/from-toml".into()),
        ..Default::default()
    };

    assert_eq!(
        resolve_root_folder(None, ENV_VAR, Some(&toml)),
        PathBuf::from("/tmp/from-toml")
    );
    assert_eq!(resolve_root_folder(None, ENV_VAR, None), default_root_folder());
}

#[test]
fn test_default_root_folder_is_named_for_app() {
    let path = default_root_folder();
    assert!(path.to_string_lossy().contains("raasta"));
}

#[test]
fn test_paths_inside_root_folder() {
    let root = PathBuf::from("/srv/raasta");
    assert_eq!(database_path(&root), PathBuf::from("/srv/raasta/raasta.db"));
    assert_eq!(photos_dir(&root), PathBuf::from("/srv/raasta/photos"));
}

#[test]
fn test_read_full_toml_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let user = Uuid::new_v4();
    std::fs::write(
        &path,
        format!(
            r#"
root_folder = "/srv/raasta"
bind_addr = "0.0.0.0:5001"
max_photo_bytes = 2048

[sessions]
"token-abc" = "{}"

[client]
api_url = "https://raasta.example/api"
max_attempts = 3
backoff_base_ms = 250
"#,
            user
        ),
    )
    .unwrap();

    let config = read_toml_config(&path).unwrap();
    assert_eq!(config.root_folder.as_deref(), Some("/srv/raasta"));
    assert_eq!(config.bind_addr.as_deref(), Some("0.0.0.0:5001"));
    assert_eq!(config.max_photo_bytes, Some(2048));
    assert_eq!(config.sessions.get("token-abc"), Some(&user));
    assert_eq!(config.client.max_attempts, Some(3));
    assert_eq!(config.client.backoff_base_ms, Some(250));
    assert!(config.client.request_timeout_secs.is_none());
}

#[test]
fn test_empty_toml_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();

    let config = read_toml_config(&path).unwrap();
    assert!(config.root_folder.is_none());
    assert!(config.sessions.is_empty());
}

#[test]
fn test_invalid_toml_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "root_folder = [").unwrap();

    let err = read_toml_config(&path).unwrap_err();
    assert!(matches!(err, raasta_common::Error::Config(_)));
}
