//! # opman-core
//!
//! Operator admission control for a shared transaction pool.
//!
//! A protected resource (a rollup transaction pool, a bridge relayer entry
//! point) accepts batches only from the identity an *operator manager*
//! authorizes at the current block height. This crate provides the
//! managers, the gate they expose, and a pool wired to one of them.
//!
//! ## Core Concepts
//!
//! - **Operator registry**: ordered list of candidate identities with a
//!   label and endpoint each
//! - **Strategy**: the rule deciding who is authorized at a height
//!   - [`RoundRobinStrategy`]: `registry[(height / slot_duration) mod n]`
//!   - [`SemaphoreStrategy`]: exclusive lock for `lock_duration` blocks
//!   - [`MutableStrategy`]: one operator assigned by the administrator
//! - **Open sentinel**: [`Address::OPEN`]; when a strategy resolves to it,
//!   every caller is authorized
//! - **Gate**: [`AccessGate::is_operator`], the single question a resource
//!   asks before executing
//!
//! ## Example
//!
//! ```rust
//! use std::num::NonZeroU64;
//!
//! use opman_core::{AccessGate, Address, CallContext, OperatorManager, RoundRobinStrategy};
//!
//! let owner: Address = "0x00000000000000000000000000000000000000a0".parse()?;
//! let rel_01 = Address::from_low_u64(1);
//! let rel_02 = Address::from_low_u64(2);
//!
//! let mut manager = OperatorManager::new(RoundRobinStrategy::new(owner, NonZeroU64::MIN)?);
//! let admin = CallContext::new(owner, 0);
//! manager.add_operator(&admin, "REL-01", rel_01, "https://rel-01.example/")?;
//! manager.add_operator(&admin, "REL-02", rel_02, "https://rel-02.example/")?;
//!
//! // Round-robin starts frozen: everyone passes.
//! assert!(manager.operator(0).is_open());
//!
//! manager.set_maintenance(&admin, false)?;
//! assert!(manager.is_operator(&rel_01, 0));
//! assert!(manager.is_operator(&rel_02, 1));
//! assert!(!manager.is_operator(&rel_02, 2));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Concurrency
//!
//! Managers are plain values. Share one through [`SharedGate`], which puts it
//! behind a read-write lock; [`Pool`] holds the read guard across its whole
//! check-then-execute path.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod identity;
pub mod manager;
pub mod pool;
pub mod quota;
pub mod registry;
pub mod strategy;

// Re-export main types at crate root for convenience
pub use admin::{AdminCapability, CallContext};
pub use clock::{ChainView, ManualChain, SlotClock};
pub use config::{ConfigError, GateConfig, OperatorConfig, QuotaConfig, StrategyConfig};
pub use error::{OperatorError, PoolError, QuotaError};
pub use events::{OperatorEvent, RecordedEvent};
pub use gate::AccessGate;
pub use identity::{Address, AddressParseError};
pub use manager::{OperatorManager, SharedGate};
pub use pool::{BatchExecutor, Pool, PoolOptions, TransactReceipt, TransactionBatch};
pub use quota::DailyQuota;
pub use registry::{OperatorEntry, OperatorRegistry};
pub use strategy::{
    ClaimOutcome, LockState, MutableStrategy, RoundRobinStrategy, ScheduledSlot,
    SemaphoreStrategy, Strategy, StrategyKind,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::admin::CallContext;
    pub use crate::clock::ChainView;
    pub use crate::error::{OperatorError, PoolError};
    pub use crate::gate::AccessGate;
    pub use crate::identity::Address;
    pub use crate::manager::{OperatorManager, SharedGate};
    pub use crate::pool::{BatchExecutor, Pool, TransactionBatch};
    pub use crate::strategy::{MutableStrategy, RoundRobinStrategy, SemaphoreStrategy};
}
