//! Interchangeable authorization strategies.
//!
//! | Strategy | Who is authorized | Changes when |
//! |---|---|---|
//! | [`RoundRobinStrategy`] | `registry[slot mod n]` | height crosses a slot boundary |
//! | [`SemaphoreStrategy`] | the lock holder, else everyone | a registered identity locks, or the lock expires |
//! | [`MutableStrategy`] | the assigned identity, else everyone | the administrator reassigns |
//!
//! A protected resource is wired to exactly one [`Strategy`] at construction
//! and never switches.

mod mutable;
mod round_robin;
mod semaphore;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use mutable::{AssignedOperator, MutableStrategy};
pub use round_robin::{
    ClaimOutcome, MAX_SCHEDULE_SLOTS, MAX_TRACKED_CLAIMANTS, RoundRobinStrategy, ScheduledSlot,
};
pub use semaphore::{LockState, SemaphoreStrategy};

use crate::admin::AdminCapability;
use crate::gate::AccessGate;
use crate::identity::Address;
use crate::registry::OperatorRegistry;

/// Names the strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Deterministic rotation.
    RoundRobin,
    /// Exclusive expiring lock.
    Semaphore,
    /// Administrator-assigned operator.
    Mutable,
}

impl StrategyKind {
    /// Returns the configuration name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::Semaphore => "semaphore",
            Self::Mutable => "mutable",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Deterministic rotation.
    RoundRobin(RoundRobinStrategy),
    /// Exclusive expiring lock.
    Semaphore(SemaphoreStrategy),
    /// Administrator-assigned operator.
    Mutable(MutableStrategy),
}

impl Strategy {
    /// Returns which variant this is.
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::RoundRobin(_) => StrategyKind::RoundRobin,
            Self::Semaphore(_) => StrategyKind::Semaphore,
            Self::Mutable(_) => StrategyKind::Mutable,
        }
    }

    /// Returns the administrator capability.
    #[must_use]
    pub const fn admin(&self) -> &AdminCapability {
        match self {
            Self::RoundRobin(s) => s.admin(),
            Self::Semaphore(s) => s.admin(),
            Self::Mutable(s) => s.admin(),
        }
    }

    pub(crate) fn admin_mut(&mut self) -> &mut AdminCapability {
        match self {
            Self::RoundRobin(s) => s.admin_mut(),
            Self::Semaphore(s) => s.admin_mut(),
            Self::Mutable(s) => s.admin_mut(),
        }
    }

    /// Returns the registry, for strategies that keep one.
    #[must_use]
    pub const fn registry(&self) -> Option<&OperatorRegistry> {
        match self {
            Self::RoundRobin(s) => Some(s.registry()),
            Self::Semaphore(s) => Some(s.registry()),
            Self::Mutable(_) => None,
        }
    }
}

impl From<RoundRobinStrategy> for Strategy {
    fn from(s: RoundRobinStrategy) -> Self {
        Self::RoundRobin(s)
    }
}

impl From<SemaphoreStrategy> for Strategy {
    fn from(s: SemaphoreStrategy) -> Self {
        Self::Semaphore(s)
    }
}

impl From<MutableStrategy> for Strategy {
    fn from(s: MutableStrategy) -> Self {
        Self::Mutable(s)
    }
}

impl AccessGate for Strategy {
    fn operator(&self, height: u64) -> Address {
        match self {
            Self::RoundRobin(s) => s.operator(height),
            Self::Semaphore(s) => s.operator(height),
            Self::Mutable(s) => s.operator(height),
        }
    }

    fn is_live(&self, candidate: &Address, height: u64) -> bool {
        match self {
            Self::RoundRobin(s) => s.is_live(candidate, height),
            Self::Semaphore(s) => s.is_live(candidate, height),
            Self::Mutable(s) => s.is_live(candidate, height),
        }
    }
}
