//! Loading run and module configuration from disk

use std::fs;
use std::path::{Path, PathBuf};

use reflector_engine::config::ConfigError;
use reflector_engine::{ModuleDescriptor, RunConfig};

#[test]
fn test_module_descriptor_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Game.toml");
    fs::write(
        &path,
        r#"
        name = "Game"
        base_directory = "Source/Game"
        public_headers = ["Public/Pawn.h"]
        private_headers = ["Private/Helpers.h"]
        "#,
    )
    .unwrap();

    let descriptor = ModuleDescriptor::load(&path).unwrap();
    assert_eq!(descriptor.name, "Game");
    assert!(descriptor.is_public(Path::new("Public/Pawn.h")));
    assert!(descriptor.is_public(Path::new("Source/Game/Public/Pawn.h")));
    assert!(descriptor.is_private(Path::new("Private/Helpers.h")));
    assert!(!descriptor.is_private(Path::new("Public/Pawn.h")));
    assert_eq!(descriptor.output_directory, PathBuf::new());
}

#[test]
fn test_run_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reflector.toml");
    fs::write(&path, "[generator]\nmax_lines_per_chunk = 500\napi_macro = \"SHARED_API\"\n").unwrap();

    let config = RunConfig::load(&path).unwrap();
    assert_eq!(config.generator.max_lines_per_chunk, 500);
    assert_eq!(config.generator.api_macro_for("Game"), "SHARED_API");
    assert_eq!(config.naming.class_prefix, "U");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RunConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_malformed_file_is_parse_error() {
    let err = ModuleDescriptor::from_toml_str("name = [").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
