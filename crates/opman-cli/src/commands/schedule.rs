//! `opman schedule`: print the round-robin rotation for a height range.

use std::path::Path;

use opman_core::{Address, OperatorManager};
use serde::{Deserialize, Serialize};

use super::{OutputFormat, config_error, exit_codes, load_manager, output_error, print_json};

/// One row of the rotation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// Slot index.
    pub slot: u64,
    /// First height of the slot.
    pub start_height: u64,
    /// Scheduled operator, or the open address.
    pub operator: Address,
    /// Label of the scheduled operator.
    pub label: Option<String>,
}

/// Rotation table for a height range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResponse {
    /// First queried height.
    pub from: u64,
    /// Last queried height.
    pub to: u64,
    /// One row per slot, in order.
    pub rows: Vec<ScheduleRow>,
}

/// Builds the rotation table.
///
/// # Errors
///
/// Returns the manager's error if the strategy is not round-robin.
pub fn build(
    manager: &OperatorManager,
    from: u64,
    to: u64,
) -> Result<ScheduleResponse, opman_core::OperatorError> {
    let rows = manager
        .schedule(from, to)?
        .into_iter()
        .map(|slot| ScheduleRow {
            slot: slot.slot,
            start_height: slot.start_height,
            operator: slot.operator,
            label: manager
                .registry()
                .and_then(|r| r.get(&slot.operator))
                .map(|e| e.label.clone()),
        })
        .collect();
    Ok(ScheduleResponse { from, to, rows })
}

/// Runs `opman schedule`.
pub fn run(path: &Path, from: u64, to: u64, format: OutputFormat) -> u8 {
    let manager = match load_manager(path) {
        Ok((_, manager)) => manager,
        Err(e) => return config_error(format, &e),
    };
    let response = match build(&manager, from, to) {
        Ok(response) => response,
        Err(e) => return output_error(format, e.code(), &e.to_string(), exit_codes::ERROR),
    };

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Text => {
            println!("{:>8}  {:>12}  {:<42}  LABEL", "SLOT", "START", "OPERATOR");
            for row in &response.rows {
                let operator = if row.operator.is_open() {
                    "open".to_string()
                } else {
                    row.operator.to_string()
                };
                println!(
                    "{:>8}  {:>12}  {:<42}  {}",
                    row.slot,
                    row.start_height,
                    operator,
                    row.label.as_deref().unwrap_or("-")
                );
            }
        },
    }
    exit_codes::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{MUTABLE, ROUND_ROBIN, config_file};
    use super::*;

    #[test]
    fn builds_rotation_table() {
        let file = config_file(ROUND_ROBIN);
        let (_, manager) = load_manager(file.path()).unwrap();
        let table = build(&manager, 0, 7).unwrap();
        let labels: Vec<_> = table.rows.iter().map(|r| r.label.as_deref()).collect();
        assert_eq!(labels, [Some("REL-01"), Some("REL-02"), Some("REL-01"), Some("REL-02")]);
        assert_eq!(table.rows[1].start_height, 2);
    }

    #[test]
    fn mutable_has_no_schedule() {
        let file = config_file(MUTABLE);
        let (_, manager) = load_manager(file.path()).unwrap();
        assert!(matches!(
            build(&manager, 0, 1),
            Err(opman_core::OperatorError::Unsupported { .. })
        ));
        assert_eq!(run(file.path(), 0, 1, OutputFormat::Json), exit_codes::ERROR);
    }
}
