//! # kernql CLI Module
//!
//! This module implements the CLI interface for kernql.
//!
//! ## Available Commands
//!
//! - `eval` - Resolve and expand the configuration at a pointer
//! - `latest` - Like `eval`, keeping only the newest kernel of each group
//! - `find-key` - List pointers to every member with a given name
//! - `missions` - List the top-level configuration keys
//! - `cache-dir` - Print the cache directory
//! - `clear-cache` - Remove every cache record

mod commands;

use crate::settings::Settings;
use clap::{Parser, Subcommand};
use kernql_core::KernqlError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// kernql - kernel configuration queries
///
/// Resolves mission configuration documents into concrete kernel paths.
#[derive(Parser, Debug)]
#[command(name = "kernql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging when RUST_LOG is unset
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML settings file
    #[arg(short = 'S', long, global = true)]
    pub settings: Option<PathBuf>,

    /// Kernel data directory (overrides SPICEROOT, ALESPICEROOT, ISISDATA)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration directory (overrides KERNQL_CONFIG_DIR)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Cache directory (overrides KERNQL_CACHE_DIR)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Resolve and expand the configuration at a pointer
    Eval {
        /// JSON pointer, e.g. /mro/ck
        pointer: String,
    },

    /// Resolve, expand and keep the latest kernels at a pointer
    Latest {
        /// JSON pointer, e.g. /mro/ck
        pointer: String,
    },

    /// List pointers to every member named KEY
    FindKey {
        /// Member name, e.g. kernels
        key: String,

        /// Only search the top level
        #[arg(long)]
        shallow: bool,
    },

    /// List the top-level configuration keys
    Missions,

    /// Print the cache directory
    CacheDir,

    /// Remove every cache record
    ClearCache,
}

impl Cli {
    /// Flags layered over the settings file, if one was given.
    pub fn effective_settings(&self) -> Result<Settings, KernqlError> {
        let flags = Settings {
            data_dir: self.data_dir.clone(),
            config_dir: self.config_dir.clone(),
            cache_dir: self.cache_dir.clone(),
        };
        match &self.settings {
            Some(path) => Ok(flags.or(Settings::load(path)?)),
            None => Ok(flags),
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments against the process environment.
pub fn execute(cli: Cli) -> Result<(), KernqlError> {
    let settings = cli.effective_settings()?;
    let lookup = |name: &str| std::env::var(name).ok();

    match cli.command {
        Commands::Eval { pointer } => cmd_eval(&settings, &lookup, &pointer, false),
        Commands::Latest { pointer } => cmd_eval(&settings, &lookup, &pointer, true),
        Commands::FindKey { key, shallow } => cmd_find_key(&settings, &lookup, &key, !shallow),
        Commands::Missions => cmd_missions(&settings, &lookup),
        Commands::CacheDir => cmd_cache_dir(&settings, &lookup),
        Commands::ClearCache => cmd_clear_cache(&settings, &lookup),
    }
}
