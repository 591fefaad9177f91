//! Configuration parsing and management.
//!
//! A gate configuration names the administrator, one strategy with its
//! parameters, the operators to seed and the daily quota of the protected
//! resource:
//!
//! ```toml
//! owner = "0x00000000000000000000000000000000000000a0"
//!
//! [strategy]
//! kind = "round_robin"
//! slot_duration = 1
//! maintenance = false
//!
//! [[operators]]
//! label = "REL-01"
//! address = "0x0000000000000000000000000000000000000001"
//! endpoint = "https://rel-01.example/"
//!
//! [quota]
//! limit = 1000000
//! ```

use std::collections::HashSet;
use std::num::NonZeroU64;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::admin::CallContext;
use crate::error::OperatorError;
use crate::identity::Address;
use crate::manager::OperatorManager;
use crate::quota::{DEFAULT_WINDOW_SECS, DailyQuota};
use crate::registry::{MAX_OPERATORS, OperatorEntry};
use crate::strategy::{
    MutableStrategy, RoundRobinStrategy, SemaphoreStrategy, Strategy, StrategyKind,
};

/// Top-level gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// The administrator identity.
    pub owner: Address,

    /// Strategy selection and parameters.
    pub strategy: StrategyConfig,

    /// Operators to register at startup. For the mutable strategy, at most
    /// one entry: the initial assignment.
    #[serde(default)]
    pub operators: Vec<OperatorConfig>,

    /// Throughput quota of the protected resource.
    #[serde(default)]
    pub quota: QuotaConfig,
}

/// Strategy selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Which strategy to run.
    pub kind: StrategyKind,

    /// Blocks per round-robin slot.
    #[serde(default = "default_slot_duration")]
    pub slot_duration: u64,

    /// Whether round-robin starts in maintenance.
    #[serde(default = "default_maintenance")]
    pub maintenance: bool,

    /// Blocks a semaphore lock lasts.
    #[serde(default = "default_lock_duration")]
    pub lock_duration: u64,
}

/// One operator to seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Human-readable label.
    pub label: String,

    /// Operator identity.
    pub address: Address,

    /// Relayer endpoint.
    #[serde(default)]
    pub endpoint: String,
}

/// Daily quota settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Amount admitted per window. Unset means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Window width in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: None,
            window_secs: default_window_secs(),
        }
    }
}

const fn default_slot_duration() -> u64 {
    1
}

const fn default_maintenance() -> bool {
    true
}

const fn default_lock_duration() -> u64 {
    5
}

const fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

impl GateConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks the cross-field rules serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_open() {
            return Err(ConfigError::Validation(
                "owner must not be the open address".to_string(),
            ));
        }

        match self.strategy.kind {
            StrategyKind::RoundRobin if self.strategy.slot_duration == 0 => {
                return Err(ConfigError::Validation(
                    "strategy.slot_duration must be greater than zero".to_string(),
                ));
            },
            StrategyKind::Semaphore if self.strategy.lock_duration == 0 => {
                return Err(ConfigError::Validation(
                    "strategy.lock_duration must be greater than zero".to_string(),
                ));
            },
            StrategyKind::Mutable if self.operators.len() > 1 => {
                return Err(ConfigError::Validation(format!(
                    "mutable strategy takes at most one operator, got {}",
                    self.operators.len()
                )));
            },
            _ => {},
        }

        if self.operators.len() > MAX_OPERATORS {
            return Err(ConfigError::Validation(format!(
                "too many operators: {} (max {MAX_OPERATORS})",
                self.operators.len()
            )));
        }

        let mut addresses = HashSet::new();
        let mut labels = HashSet::new();
        for op in &self.operators {
            if !addresses.insert(op.address) {
                return Err(ConfigError::Validation(format!(
                    "duplicate operator address {}",
                    op.address
                )));
            }
            if !labels.insert(op.label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate operator label '{}'",
                    op.label
                )));
            }
        }

        if self.quota.window_secs == 0 {
            return Err(ConfigError::Validation(
                "quota.window_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Builds the configured manager with its operators seeded.
    ///
    /// Seeding runs as the owner at height 0 and is not journaled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the configuration is invalid or
    /// an operator entry is rejected.
    pub fn build_manager(&self) -> Result<OperatorManager, ConfigError> {
        self.validate()?;
        let ctx = CallContext::new(self.owner, 0);

        let strategy: Strategy = match self.strategy.kind {
            StrategyKind::RoundRobin => {
                let mut rr =
                    RoundRobinStrategy::new(self.owner, nonzero(self.strategy.slot_duration)?)?;
                for op in &self.operators {
                    rr.add_operator(&ctx, &op.label, op.address, &op.endpoint)?;
                }
                rr.set_maintenance(&ctx, self.strategy.maintenance)?;
                rr.into()
            },
            StrategyKind::Semaphore => {
                let mut sem =
                    SemaphoreStrategy::new(self.owner, nonzero(self.strategy.lock_duration)?)?;
                for op in &self.operators {
                    sem.add_operator(&ctx, &op.label, op.address, &op.endpoint)?;
                }
                sem.into()
            },
            StrategyKind::Mutable => {
                let initial = self
                    .operators
                    .first()
                    .filter(|op| !op.address.is_open())
                    .map(|op| {
                        OperatorEntry::new(op.label.as_str(), op.address, op.endpoint.as_str())
                    })
                    .transpose()?;
                MutableStrategy::new(self.owner, initial)?.into()
            },
        };

        tracing::debug!(
            kind = %self.strategy.kind,
            owner = %self.owner,
            operators = self.operators.len(),
            "operator manager built from configuration"
        );
        Ok(OperatorManager::new(strategy))
    }

    /// Builds the configured quota.
    #[must_use]
    pub fn build_quota(&self) -> DailyQuota {
        DailyQuota::with_window(self.quota.limit.unwrap_or(u64::MAX), self.quota.window_secs)
    }
}

fn nonzero(value: u64) -> Result<NonZeroU64, ConfigError> {
    NonZeroU64::new(value)
        .ok_or_else(|| ConfigError::Validation("duration must be greater than zero".to_string()))
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl From<OperatorError> for ConfigError {
    fn from(err: OperatorError) -> Self {
        Self::Validation(err.to_string())
    }
}
