//! # Locations
//!
//! Resolution of the data, configuration and cache directories from
//! environment variables.
//!
//! Every resolver takes the variable lookup as an argument; `from_env`
//! passes `std::env::var`. Tests pass a closure over a map instead of
//! touching the process environment.

use crate::primitives::{CACHE_DIR_VAR, CONFIG_DIR_VAR, DATA_DIR_VARS, PREFIX_VAR};
use crate::KernqlError;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// The three directories the engine works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Locations {
    /// Resolve all three from the process environment.
    pub fn from_env() -> Result<Self, KernqlError> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    pub fn resolve<F>(lookup: F) -> Result<Self, KernqlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            data_dir: data_directory(&lookup)?,
            config_dir: config_directory(&lookup)?,
            cache_dir: cache_directory(&lookup)?,
        })
    }
}

/// The first of `SPICEROOT`, `ALESPICEROOT`, `ISISDATA` naming a directory.
pub fn data_directory<F>(lookup: &F) -> Result<PathBuf, KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    first_existing(lookup, &DATA_DIR_VARS).ok_or_else(|| {
        KernqlError::IoError(format!(
            "None of the data directory variables name an existing directory: {}",
            DATA_DIR_VARS.join(", ")
        ))
    })
}

/// `KERNQL_CONFIG_DIR`, else `$CONDA_PREFIX/etc/kernql/db`.
pub fn config_directory<F>(lookup: &F) -> Result<PathBuf, KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = first_existing(lookup, &[CONFIG_DIR_VAR]) {
        return Ok(dir);
    }
    if let Some(prefix) = lookup(PREFIX_VAR) {
        let dir = PathBuf::from(prefix).join("etc").join("kernql").join("db");
        if dir.is_dir() {
            return Ok(dir);
        }
    }
    Err(KernqlError::IoError(format!(
        "No configuration directory: set {} or install under {}",
        CONFIG_DIR_VAR, PREFIX_VAR
    )))
}

/// `KERNQL_CACHE_DIR`, else a fresh `<tmp>/kernql-cache-<random>/kernql_cache`.
///
/// The directory is created if it does not exist.
pub fn cache_directory<F>(lookup: &F) -> Result<PathBuf, KernqlError>
where
    F: Fn(&str) -> Option<String>,
{
    let dir = match lookup(CACHE_DIR_VAR).filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => fresh_temp_root()?.join("kernql_cache"),
    };
    fs::create_dir_all(&dir).map_err(|e| {
        KernqlError::IoError(format!(
            "Failed to create cache directory {}: {}",
            dir.display(),
            e
        ))
    })?;
    debug!(cache_dir = %dir.display(), "cache directory ready");
    Ok(dir)
}

fn first_existing<F>(lookup: &F, vars: &[&str]) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    vars.iter()
        .filter_map(|var| lookup(*var))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .find(|path| path.is_dir())
}

/// A uniquely named directory under the system temp dir that outlives the
/// process.
fn fresh_temp_root() -> Result<PathBuf, KernqlError> {
    let dir = tempfile::Builder::new()
        .prefix("kernql-cache-")
        .tempdir()
        .map_err(|e| {
            KernqlError::IoError(format!("Failed to create temporary cache directory: {}", e))
        })?;
    Ok(dir.keep())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn data_dir_precedence_skips_missing() {
        let spice = tempfile::tempdir().expect("tempdir");
        let isis = tempfile::tempdir().expect("tempdir");
        let spice_path = spice.path().to_string_lossy().into_owned();
        let isis_path = isis.path().to_string_lossy().into_owned();

        let both = env(&[("SPICEROOT", spice_path.as_str()), ("ISISDATA", isis_path.as_str())]);
        assert_eq!(data_directory(&both).expect("data"), spice.path());

        let stale = env(&[("SPICEROOT", "/does/not/exist"), ("ISISDATA", isis_path.as_str())]);
        assert_eq!(data_directory(&stale).expect("data"), isis.path());

        assert!(matches!(
            data_directory(&env(&[])),
            Err(KernqlError::IoError(_))
        ));
    }

    #[test]
    fn config_dir_falls_back_to_prefix() {
        let prefix = tempfile::tempdir().expect("tempdir");
        let db = prefix.path().join("etc").join("kernql").join("db");
        fs::create_dir_all(&db).expect("mkdir");
        let prefix_path = prefix.path().to_string_lossy().into_owned();

        let lookup = env(&[("CONDA_PREFIX", prefix_path.as_str())]);
        assert_eq!(config_directory(&lookup).expect("config"), db);
        assert!(config_directory(&env(&[])).is_err());
    }

    #[test]
    fn cache_dir_created() {
        let root = tempfile::tempdir().expect("tempdir");
        let wanted = root.path().join("deep").join("cache");
        let wanted_str = wanted.to_string_lossy().into_owned();

        let dir = cache_directory(&env(&[("KERNQL_CACHE_DIR", wanted_str.as_str())])).expect("cache");
        assert_eq!(dir, wanted);
        assert!(wanted.is_dir());
    }

    #[test]
    fn default_cache_dir_is_under_tmp() {
        let dir = cache_directory(&env(&[])).expect("cache");
        assert!(dir.starts_with(std::env::temp_dir()));
        assert!(dir.ends_with("kernql_cache"));
        let _ = fs::remove_dir_all(dir.parent().expect("parent"));
    }

    #[test]
    fn default_cache_dirs_are_distinct_per_call() {
        let first = cache_directory(&env(&[])).expect("cache");
        let second = cache_directory(&env(&[])).expect("cache");
        assert_ne!(first, second);
        assert!(first.is_dir());
        assert!(second.is_dir());

        let parent = first.parent().expect("parent");
        let name = parent.file_name().expect("name").to_string_lossy();
        assert!(name.starts_with("kernql-cache-"));

        let _ = fs::remove_dir_all(parent);
        let _ = fs::remove_dir_all(second.parent().expect("parent"));
    }
}
