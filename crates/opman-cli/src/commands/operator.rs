//! `opman operator` and `opman check`: resolve the gate at a height.
//!
//! Both commands evaluate a freshly built manager, so they describe the
//! configured state: no claims, no locks, no runtime reassignments.

use std::path::Path;

use opman_core::{AccessGate, Address, OperatorManager, StrategyKind};
use serde::{Deserialize, Serialize};

use super::{OutputFormat, config_error, exit_codes, load_manager, print_json};

/// Resolution of the gate at one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorResponse {
    /// Configured strategy.
    pub strategy: StrategyKind,
    /// Queried height.
    pub height: u64,
    /// Resolved operator, or the open address.
    pub operator: Address,
    /// Whether every caller passes.
    pub open: bool,
    /// Label of the resolved operator.
    pub label: Option<String>,
    /// Endpoint of the resolved operator.
    pub endpoint: Option<String>,
}

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Checked address.
    pub address: Address,
    /// Queried height.
    pub height: u64,
    /// Whether `address` may submit at `height`.
    pub authorized: bool,
    /// Resolved operator.
    pub operator: Address,
}

/// Resolves the gate at `height`.
pub fn resolve(manager: &OperatorManager, height: u64) -> OperatorResponse {
    let operator = manager.operator(height);
    OperatorResponse {
        strategy: manager.kind(),
        height,
        operator,
        open: operator.is_open(),
        label: manager.operator_name(height).map(str::to_string),
        endpoint: manager.operator_uri(height).map(str::to_string),
    }
}

/// Checks `address` at `height`.
pub fn check(manager: &OperatorManager, address: Address, height: u64) -> CheckResponse {
    CheckResponse {
        address,
        height,
        authorized: manager.is_operator(&address, height),
        operator: manager.operator(height),
    }
}

/// Runs `opman operator`.
pub fn run_operator(path: &Path, height: u64, format: OutputFormat) -> u8 {
    let manager = match load_manager(path) {
        Ok((_, manager)) => manager,
        Err(e) => return config_error(format, &e),
    };
    let response = resolve(&manager, height);

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Text if response.open => {
            println!("Height {height}: open (any caller may submit)");
        },
        OutputFormat::Text => {
            println!("Height {height}: {}", response.operator);
            if let Some(label) = &response.label {
                println!("  Label:    {label}");
            }
            if let Some(endpoint) = response.endpoint.as_deref().filter(|e| !e.is_empty()) {
                println!("  Endpoint: {endpoint}");
            }
        },
    }
    exit_codes::SUCCESS
}

/// Runs `opman check`.
pub fn run_check(path: &Path, address: Address, height: u64, format: OutputFormat) -> u8 {
    let manager = match load_manager(path) {
        Ok((_, manager)) => manager,
        Err(e) => return config_error(format, &e),
    };
    let response = check(&manager, address, height);
    tracing::debug!(
        address = %address,
        height,
        authorized = response.authorized,
        "authorization checked"
    );

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Text if response.authorized => {
            println!("{address} is authorized at height {height}");
        },
        OutputFormat::Text => {
            println!(
                "{address} is not authorized at height {height} (operator is {})",
                response.operator
            );
        },
    }

    if response.authorized {
        exit_codes::SUCCESS
    } else {
        exit_codes::NOT_AUTHORIZED
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{MUTABLE, ROUND_ROBIN, config_file};
    use super::*;

    fn rel(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    #[test]
    fn resolves_round_robin_with_metadata() {
        let file = config_file(ROUND_ROBIN);
        let (_, manager) = load_manager(file.path()).unwrap();

        let at_0 = resolve(&manager, 0);
        assert_eq!(at_0.operator, rel(1));
        assert_eq!(at_0.label.as_deref(), Some("REL-01"));
        assert!(!at_0.open);

        let at_3 = resolve(&manager, 3);
        assert_eq!(at_3.operator, rel(2));
        assert_eq!(at_3.endpoint.as_deref(), Some("https://rel-02.example/"));
    }

    #[test]
    fn check_matches_resolution() {
        let file = config_file(MUTABLE);
        let (_, manager) = load_manager(file.path()).unwrap();
        assert!(check(&manager, rel(1), 10).authorized);
        let denied = check(&manager, rel(2), 10);
        assert!(!denied.authorized);
        assert_eq!(denied.operator, rel(1));
    }

    #[test]
    fn check_exit_codes() {
        let file = config_file(MUTABLE);
        assert_eq!(
            run_check(file.path(), rel(1), 0, OutputFormat::Json),
            exit_codes::SUCCESS
        );
        assert_eq!(
            run_check(file.path(), rel(2), 0, OutputFormat::Text),
            exit_codes::NOT_AUTHORIZED
        );
        assert_eq!(
            run_check(Path::new("/nonexistent/opman.toml"), rel(1), 0, OutputFormat::Text),
            exit_codes::ERROR
        );
    }
}
