//! Configuration loading and root folder resolution
//!
//! Tests touching MRP_ROOT_FOLDER / MRP_CONFIG are marked #[serial] so they
//! never race on process environment.

use mrp_common::config::{
    load_config, load_toml_config, resolve_root_folder, write_toml_config, ResolverSettings,
    TomlConfig, CONFIG_ENV_VAR, ROOT_FOLDER_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(std::path::Path::new("/from/cli")), &config);
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/env"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_used_when_no_overrides() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));
}

#[test]
fn test_write_then_load_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("mrp-wr.toml");

    let mut config = TomlConfig::default();
    config.resolver = ResolverSettings {
        exact_name_min_len: 14,
        max_concurrent_rows: 2,
        ..Default::default()
    };
    config.plans.default_well_limit = 0;

    write_toml_config(&config, &path).unwrap();
    let loaded = load_toml_config(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_plan_limit_zero_means_unlimited() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("plans.toml");
    std::fs::write(&path, "[plans]\ndefault_well_limit = 0\n").unwrap();

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded.plans.default_plan, "free");
    assert_eq!(loaded.plans.well_limit(), None);

    assert_eq!(TomlConfig::default().plans.well_limit(), Some(25));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "[resolver\nmax_candidates = ").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, mrp_common::Error::Config(_)));
}

#[test]
#[serial]
fn test_config_env_var_is_honoured() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("env.toml");
    std::fs::write(&path, "[server]\nport = 6001\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let config = load_config(None, "mrp-wr-test").unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.server.port, 6001);
    assert_eq!(config.server.bind, "127.0.0.1");
}
