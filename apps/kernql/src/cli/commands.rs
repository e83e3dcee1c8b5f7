//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Each command builds its JSON result with a `*_value` function and
//! prints it; the split keeps results testable without capturing stdout.

use crate::settings::Settings;
use kernql_core::{Config, ExpiringCache, KernqlError};
use serde_json::{Value, json};
use tracing::info;

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Load the configuration the settings point at.
pub fn load_config<F>(settings: &Settings, lookup: &F) -> Result<Config, KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    let locations = settings.locations(lookup)?;
    Config::from_locations(&locations)
}

fn print_json(value: &Value) -> Result<(), KernqlError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| KernqlError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// EVAL / LATEST COMMANDS
// =============================================================================

pub fn eval_value(config: &Config, pointer: &str, latest: bool) -> Result<Value, KernqlError> {
    if latest {
        config.get_latest(pointer)
    } else {
        config.get(pointer)
    }
}

/// Evaluate a pointer and print the resulting document.
pub fn cmd_eval<F>(
    settings: &Settings,
    lookup: &F,
    pointer: &str,
    latest: bool,
) -> Result<(), KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = load_config(settings, lookup)?;
    print_json(&eval_value(&config, pointer, latest)?)
}

// =============================================================================
// FIND-KEY COMMAND
// =============================================================================

pub fn find_key_value(config: &Config, key: &str, recursive: bool) -> Value {
    let pointers: Vec<String> = config
        .find_key(key, recursive)
        .iter()
        .map(ToString::to_string)
        .collect();
    json!(pointers)
}

pub fn cmd_find_key<F>(
    settings: &Settings,
    lookup: &F,
    key: &str,
    recursive: bool,
) -> Result<(), KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = load_config(settings, lookup)?;
    print_json(&find_key_value(&config, key, recursive))
}

// =============================================================================
// MISSIONS COMMAND
// =============================================================================

pub fn cmd_missions<F>(settings: &Settings, lookup: &F) -> Result<(), KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = load_config(settings, lookup)?;
    print_json(&json!(config.mission_keys()))
}

// =============================================================================
// CACHE COMMANDS
// =============================================================================

pub fn cmd_cache_dir<F>(settings: &Settings, lookup: &F) -> Result<(), KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    let dir = settings.cache_dir(lookup)?;
    print_json(&json!({ "cache_dir": dir.to_string_lossy() }))
}

pub fn cmd_clear_cache<F>(settings: &Settings, lookup: &F) -> Result<(), KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    let dir = settings.cache_dir(lookup)?;
    let removed = ExpiringCache::new(&dir)?.clear()?;
    info!(cache_dir = %dir.display(), removed, "cache cleared");
    print_json(&json!({ "cache_dir": dir.to_string_lossy(), "removed": removed }))
}
