//! Unit tests for configuration loading.

use super::*;

#[test]
fn default_config_points_at_data_dir() {
    let config = Config::default();
    assert!(config.database.ends_with("chatdex.db"));
    assert_eq!(config.search.default_limit, 50);
}

#[test]
fn roundtrips_through_toml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.database = dir.path().join("custom.db");
    config.search.default_limit = 10;
    config.save_to_path(&path).expect("save");

    let loaded = Config::load_from_path(&path).expect("load");
    assert_eq!(loaded.database, config.database);
    assert_eq!(loaded.search.default_limit, 10);
}

#[test]
fn ensure_at_creates_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("config.toml");

    assert!(!path.exists());
    let config = Config::ensure_at(&path).expect("ensure");
    assert!(path.exists());
    assert_eq!(config.search.default_limit, 50);
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "database = \"/tmp/somewhere.db\"\n").expect("write");

    let config = Config::load_from_path(&path).expect("load");
    assert_eq!(config.database, std::path::PathBuf::from("/tmp/somewhere.db"));
    assert_eq!(config.search.default_limit, 50);
}

#[test]
fn malformed_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "database = [not toml").expect("write");

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, crate::Error::Config(_)));
}
