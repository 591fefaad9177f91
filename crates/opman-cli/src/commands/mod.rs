//! Command implementations.
//!
//! Every command loads the gate configuration, builds the manager, and
//! prints either a human-readable summary or pretty JSON on stdout. Errors
//! go to stderr in the same format.
//!
//! # Exit Codes
//!
//! - 0: Success (for `check`: the address is authorized)
//! - 1: `check` only, the address is not authorized
//! - 2: Error (configuration, unsupported query)

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use opman_core::{GateConfig, OperatorManager};
use serde::{Deserialize, Serialize};

pub mod operator;
pub mod schedule;
pub mod validate;

/// Exit codes shared by all commands.
pub mod exit_codes {
    /// Success exit code.
    pub const SUCCESS: u8 = 0;
    /// The checked address is not authorized.
    pub const NOT_AUTHORIZED: u8 = 1;
    /// General error exit code.
    pub const ERROR: u8 = 2;
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

/// Loads and validates the configuration at `path`.
pub fn load_config(path: &Path) -> Result<GateConfig> {
    GateConfig::from_file(path)
        .with_context(|| format!("failed to load gate configuration {}", path.display()))
}

/// Loads the configuration and builds its manager.
pub fn load_manager(path: &Path) -> Result<(GateConfig, OperatorManager)> {
    let config = load_config(path)?;
    let manager = config
        .build_manager()
        .with_context(|| format!("failed to build operator manager from {}", path.display()))?;
    Ok((config, manager))
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Reports an error on stderr and returns `exit_code`.
pub fn output_error(format: OutputFormat, code: &str, message: &str, exit_code: u8) -> u8 {
    match format {
        OutputFormat::Json => {
            let error = ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
            };
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| "{}".to_string())
            );
        },
        OutputFormat::Text => eprintln!("Error: {message}"),
    }
    exit_code
}

/// Reports a configuration failure.
pub fn config_error(format: OutputFormat, err: &anyhow::Error) -> u8 {
    tracing::debug!(error = %format!("{err:#}"), "configuration rejected");
    output_error(format, "config_error", &format!("{err:#}"), exit_codes::ERROR)
}
