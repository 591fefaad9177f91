//! Events emitted by successful manager mutations.

use serde::{Deserialize, Serialize};

use crate::identity::Address;

/// A state change made by an administrator or operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorEvent {
    /// An operator was appended to the registry.
    OperatorAdded {
        /// Label of the new entry.
        label: String,
        /// Address of the new entry.
        address: Address,
        /// Endpoint of the new entry.
        endpoint: String,
    },
    /// An operator was removed from the registry.
    OperatorRemoved {
        /// Label of the removed entry.
        label: String,
        /// Address of the removed entry.
        address: Address,
    },
    /// Maintenance mode was switched.
    MaintenanceChanged {
        /// New flag value.
        enabled: bool,
    },
    /// A caller recorded liveness for a round-robin slot.
    Claimed {
        /// The slot claimed.
        slot: u64,
        /// Who claimed it.
        claimant: Address,
        /// Whether the claimant was the scheduled operator.
        scheduled: bool,
    },
    /// The semaphore lock was taken.
    Locked {
        /// The new holder.
        holder: Address,
        /// Height of acquisition.
        acquired_at: u64,
        /// First height at which the lock no longer applies.
        expires_at: u64,
    },
    /// The semaphore lock was released by an administrator.
    Unlocked {
        /// The holder whose lock was released.
        holder: Address,
    },
    /// The mutable assignment was replaced.
    OperatorSet {
        /// New label.
        label: String,
        /// New address; the open sentinel means open mode.
        address: Address,
        /// New endpoint.
        endpoint: String,
    },
    /// The administrator capability moved.
    OwnershipTransferred {
        /// Previous owner.
        previous: Address,
        /// New owner.
        owner: Address,
    },
}

impl OperatorEvent {
    /// Returns a dotted event-type name, e.g. `operator.added`.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::OperatorAdded { .. } => "operator.added",
            Self::OperatorRemoved { .. } => "operator.removed",
            Self::MaintenanceChanged { .. } => "operator.maintenance_changed",
            Self::Claimed { .. } => "operator.claimed",
            Self::Locked { .. } => "operator.locked",
            Self::Unlocked { .. } => "operator.unlocked",
            Self::OperatorSet { .. } => "operator.set",
            Self::OwnershipTransferred { .. } => "operator.ownership_transferred",
        }
    }
}

/// An event stamped with the height at which it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Height of the call that produced the event.
    pub height: u64,
    /// The event itself.
    pub event: OperatorEvent,
}
