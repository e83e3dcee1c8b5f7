//! # kernql - Kernel Configuration Queries
//!
//! The command-line front end of the kernql configuration engine.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate a mission's configuration
//! kernql eval /mro
//!
//! # Only the newest kernels of each group
//! kernql latest /mro/ck --settings kernql.toml
//!
//! # Where are the kernel templates?
//! kernql find-key kernels
//! ```

use clap::Parser;
use kernql::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // KERNQL_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("KERNQL_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "kernql=debug,kernql_core=debug"
    } else {
        "kernql=info,kernql_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
