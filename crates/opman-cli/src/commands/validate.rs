//! `opman validate`: parse, validate and summarize a configuration.

use std::path::Path;

use opman_core::{Address, GateConfig, OperatorManager, StrategyKind};
use serde::{Deserialize, Serialize};

use super::{OutputFormat, config_error, exit_codes, load_manager, print_json};

/// Summary of a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// Always `true`; invalid configurations produce an error instead.
    pub valid: bool,
    /// Configured strategy.
    pub strategy: StrategyKind,
    /// Administrator identity.
    pub owner: Address,
    /// Number of seeded operators.
    pub operators: usize,
    /// Round-robin slot width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_duration: Option<u64>,
    /// Round-robin initial maintenance flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<bool>,
    /// Semaphore lock length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_duration: Option<u64>,
    /// Per-window quota, `None` if unlimited.
    pub quota_limit: Option<u64>,
    /// Quota window width.
    pub quota_window_secs: u64,
}

/// Builds the summary for `config`.
pub fn summarize(config: &GateConfig, manager: &OperatorManager) -> ValidateResponse {
    let kind = manager.kind();
    ValidateResponse {
        valid: true,
        strategy: kind,
        owner: manager.owner(),
        operators: config.operators.len(),
        slot_duration: (kind == StrategyKind::RoundRobin).then_some(config.strategy.slot_duration),
        maintenance: (kind == StrategyKind::RoundRobin).then_some(config.strategy.maintenance),
        lock_duration: (kind == StrategyKind::Semaphore).then_some(config.strategy.lock_duration),
        quota_limit: config.quota.limit,
        quota_window_secs: config.quota.window_secs,
    }
}

/// Runs `opman validate`.
pub fn run(path: &Path, format: OutputFormat) -> u8 {
    let (config, manager) = match load_manager(path) {
        Ok(loaded) => loaded,
        Err(e) => return config_error(format, &e),
    };
    let summary = summarize(&config, &manager);

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            println!("Configuration is valid: {}", path.display());
            println!("  Strategy:   {}", summary.strategy);
            println!("  Owner:      {}", summary.owner);
            println!("  Operators:  {}", summary.operators);
            if let Some(d) = summary.slot_duration {
                println!("  Slot:       {d} blocks");
            }
            if let Some(m) = summary.maintenance {
                println!("  Maintenance: {m}");
            }
            if let Some(d) = summary.lock_duration {
                println!("  Lock:       {d} blocks");
            }
            match summary.quota_limit {
                Some(limit) => println!(
                    "  Quota:      {limit} per {}s",
                    summary.quota_window_secs
                ),
                None => println!("  Quota:      unlimited"),
            }
        },
    }
    exit_codes::SUCCESS
}
