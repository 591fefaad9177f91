//! Error types for operator management and gated admission.
//!
//! Every failing operation leaves manager, registry and quota state exactly
//! as it was before the call.

use thiserror::Error;

use crate::identity::Address;
use crate::strategy::StrategyKind;

/// Errors raised by the operator registry and the authorization strategies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperatorError {
    /// The caller lacks the required capability or is not the resolved
    /// operator.
    #[error("unauthorized: {caller} {reason}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// What was missing.
        reason: String,
    },

    /// An operator with this address or label is already registered.
    #[error("operator already registered: label={label}, address={address}")]
    DuplicateOperator {
        /// The conflicting label.
        label: String,
        /// The conflicting address.
        address: Address,
    },

    /// No operator with this address is registered.
    #[error("operator not found: {address}")]
    NotFound {
        /// The missing address.
        address: Address,
    },

    /// A non-expired semaphore lock is held.
    #[error("operator lock already held by {holder} until height {expires_at}")]
    AlreadyLocked {
        /// Current holder.
        holder: Address,
        /// Height at which the lock lapses.
        expires_at: u64,
    },

    /// Only registered identities may acquire the semaphore lock.
    #[error("caller {caller} is not a registered operator")]
    NotRegistered {
        /// The unregistered caller.
        caller: Address,
    },

    /// A non-administrative mutation was attempted while the manager is
    /// frozen.
    #[error("maintenance mode is active: {operation} rejected")]
    MaintenanceActive {
        /// The rejected operation.
        operation: &'static str,
    },

    /// The configured strategy does not offer this operation.
    #[error("operation {operation} is not supported by the {strategy} strategy")]
    Unsupported {
        /// The requested operation.
        operation: &'static str,
        /// The configured strategy.
        strategy: StrategyKind,
    },

    /// Invalid input.
    #[error("invalid input for field {field}: {reason}")]
    InvalidInput {
        /// The field name.
        field: &'static str,
        /// The reason it is invalid.
        reason: String,
    },
}

impl OperatorError {
    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(caller: Address, reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            caller,
            reason: reason.into(),
        }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::DuplicateOperator { .. } => "DUPLICATE_OPERATOR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyLocked { .. } => "ALREADY_LOCKED",
            Self::NotRegistered { .. } => "NOT_REGISTERED",
            Self::MaintenanceActive { .. } => "MAINTENANCE_ACTIVE",
            Self::Unsupported { .. } => "UNSUPPORTED",
            Self::InvalidInput { .. } => "INVALID_INPUT",
        }
    }
}

/// Errors raised by the daily quota.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuotaError {
    /// The amount does not fit in what is left of the current window.
    #[error("daily quota exceeded: requested {requested}, remaining {remaining}")]
    QuotaExceeded {
        /// The amount requested.
        requested: u64,
        /// The amount remaining in the current window.
        remaining: u64,
    },
}

/// Errors raised by the gated pool entry point.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The operator gate rejected the caller.
    #[error(transparent)]
    Operator(#[from] OperatorError),

    /// The caller is the scheduled operator but has not claimed the current
    /// slot.
    #[error("operator {caller} has not claimed slot {slot}")]
    NotClaimed {
        /// The caller.
        caller: Address,
        /// The slot that lacks a claim.
        slot: u64,
    },

    /// The quota gate rejected the batch.
    #[error(transparent)]
    Quota(#[from] QuotaError),

    /// The batch executor rejected the batch.
    #[error("batch {batch_id} rejected: {reason}")]
    Rejected {
        /// The batch identifier.
        batch_id: u64,
        /// Why the executor refused it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            OperatorError::unauthorized(Address::from_low_u64(1), "not owner").code(),
            "UNAUTHORIZED"
        );
        assert_eq!(
            OperatorError::MaintenanceActive { operation: "claim" }.code(),
            "MAINTENANCE_ACTIVE"
        );
    }

    #[test]
    fn pool_error_wraps_operator_error() {
        let err: PoolError =
            OperatorError::unauthorized(Address::from_low_u64(2), "not the operator").into();
        assert!(matches!(
            err,
            PoolError::Operator(OperatorError::Unauthorized { .. })
        ));
        assert!(err.to_string().contains("not the operator"));
    }
}
