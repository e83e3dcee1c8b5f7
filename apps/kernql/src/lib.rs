//! # kernql
//!
//! Library half of the kernql binary: the CLI definition and the settings
//! layer, exposed for integration tests.

pub mod cli;
pub mod settings;

pub use settings::Settings;
