//! CLI parsing and settings precedence.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use kernql::Settings;
use kernql::cli::{Cli, Commands, eval_value, find_key_value, load_config};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| map.get(name).cloned()
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// =============================================================================
// PARSING TESTS
// =============================================================================

#[test]
fn test_parse_eval_with_global_flags() {
    let cli = Cli::try_parse_from([
        "kernql",
        "eval",
        "/mro/ck",
        "--data-dir",
        "/isis/data",
        "-v",
    ])
    .unwrap();

    assert!(cli.verbose);
    assert_eq!(cli.data_dir, Some(PathBuf::from("/isis/data")));
    assert_eq!(
        cli.command,
        Commands::Eval {
            pointer: "/mro/ck".to_string()
        }
    );
}

#[test]
fn test_parse_find_key_shallow() {
    let cli = Cli::try_parse_from(["kernql", "find-key", "kernels", "--shallow"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::FindKey {
            key: "kernels".to_string(),
            shallow: true
        }
    );

    let cli = Cli::try_parse_from(["kernql", "cache-dir"]).unwrap();
    assert_eq!(cli.command, Commands::CacheDir);
}

#[test]
fn test_parse_requires_command() {
    assert!(Cli::try_parse_from(["kernql"]).is_err());
    assert!(Cli::try_parse_from(["kernql", "eval"]).is_err());
}

// =============================================================================
// SETTINGS TESTS
// =============================================================================

#[test]
fn test_settings_file_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernql.toml");
    fs::write(&path, "data_dir = \"/isis/data\"\ncache_dir = \"/tmp/kq\"\n").unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.data_dir, Some(PathBuf::from("/isis/data")));
    assert_eq!(settings.config_dir, None);
    assert_eq!(settings.cache_dir, Some(PathBuf::from("/tmp/kq")));
}

#[test]
fn test_settings_rejects_unknown_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernql.toml");
    fs::write(&path, "data_directory = \"/isis/data\"\n").unwrap();

    assert!(Settings::load(&path).is_err());
}

#[test]
fn test_flags_override_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernql.toml");
    fs::write(&path, "data_dir = \"/from/file\"\nconfig_dir = \"/file/db\"\n").unwrap();

    let settings_path = path_str(&path);
    let cli = Cli::try_parse_from([
        "kernql",
        "missions",
        "--settings",
        settings_path.as_str(),
        "--data-dir",
        "/from/flag",
    ])
    .unwrap();
    let settings = cli.effective_settings().unwrap();

    assert_eq!(settings.data_dir, Some(PathBuf::from("/from/flag")));
    assert_eq!(settings.config_dir, Some(PathBuf::from("/file/db")));
    assert_eq!(settings.cache_dir, None);
}

#[test]
fn test_file_overrides_environment() {
    let from_env = tempfile::tempdir().unwrap();
    let from_file = tempfile::tempdir().unwrap();
    let lookup = env(&[("SPICEROOT", path_str(from_env.path()).as_str())]);

    let settings = Settings {
        data_dir: Some(from_file.path().to_path_buf()),
        ..Settings::default()
    };
    assert_eq!(settings.data_dir(&lookup).unwrap(), from_file.path());
    assert_eq!(Settings::default().data_dir(&lookup).unwrap(), from_env.path());
}

#[test]
fn test_explicit_missing_directory_is_error() {
    let settings = Settings {
        config_dir: Some(PathBuf::from("/does/not/exist")),
        ..Settings::default()
    };
    assert!(settings.config_dir(&env(&[])).is_err());
}

// =============================================================================
// COMMAND TESTS
// =============================================================================

#[test]
fn test_eval_and_find_key_against_directories() {
    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    let db = root.path().join("db");
    let cache = root.path().join("cache");
    fs::create_dir_all(data.join("mro/kernels/fk")).unwrap();
    fs::write(data.join("mro/kernels/fk/mro_v01.tf"), b"").unwrap();
    fs::write(data.join("mro/kernels/fk/mro_v02.tf"), b"").unwrap();
    fs::create_dir_all(&db).unwrap();
    fs::write(
        db.join("mro.json"),
        r#"{"mro": {"fk": {"kernels": ["mro_v\\d+\\.tf$"]}}}"#,
    )
    .unwrap();

    let settings = Settings {
        data_dir: Some(data.clone()),
        config_dir: Some(db),
        cache_dir: Some(cache.clone()),
    };
    let config = load_config(&settings, &env(&[])).unwrap();
    assert!(cache.is_dir());

    let fk = data.join("mro/kernels/fk");
    let evaluated = eval_value(&config, "/mro", false).unwrap();
    assert_eq!(
        evaluated["mro"]["fk"]["kernels"],
        serde_json::json!([[path_str(&fk.join("mro_v01.tf")), path_str(&fk.join("mro_v02.tf"))]])
    );

    let latest = eval_value(&config, "/mro", true).unwrap();
    assert_eq!(
        latest["mro"]["fk"]["kernels"],
        serde_json::json!([[path_str(&fk.join("mro_v02.tf"))]])
    );

    assert_eq!(
        find_key_value(&config, "kernels", true),
        serde_json::json!(["/mro/fk/kernels"])
    );
    assert_eq!(find_key_value(&config, "kernels", false), serde_json::json!([]));
}
