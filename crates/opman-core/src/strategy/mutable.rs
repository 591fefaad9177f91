//! Administrator-assigned single operator.
//!
//! No rotation, no expiry, no liveness tracking. The administrator replaces
//! the assignment with `set_operator`; assigning the open sentinel switches
//! to open mode.

use serde::{Deserialize, Serialize};

use crate::admin::{AdminCapability, CallContext};
use crate::error::OperatorError;
use crate::events::OperatorEvent;
use crate::gate::AccessGate;
use crate::identity::Address;
use crate::registry::OperatorEntry;

/// The currently assigned operator.
pub type AssignedOperator = OperatorEntry;

/// Manually assigned operator manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableStrategy {
    admin: AdminCapability,
    assigned: Option<AssignedOperator>,
}

impl MutableStrategy {
    /// Creates a strategy owned by `owner` with an optional first assignment.
    /// `None` starts in open mode.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::InvalidInput` if `owner` is the open sentinel.
    pub fn new(owner: Address, initial: Option<AssignedOperator>) -> Result<Self, OperatorError> {
        Ok(Self {
            admin: AdminCapability::new(owner)?,
            assigned: initial,
        })
    }

    /// Returns the administrator capability.
    #[must_use]
    pub const fn admin(&self) -> &AdminCapability {
        &self.admin
    }

    pub(crate) fn admin_mut(&mut self) -> &mut AdminCapability {
        &mut self.admin
    }

    /// Returns the assignment, or `None` in open mode.
    #[must_use]
    pub const fn assigned(&self) -> Option<&AssignedOperator> {
        self.assigned.as_ref()
    }

    /// Label of the assigned operator.
    #[must_use]
    pub fn operator_name(&self) -> Option<&str> {
        self.assigned.as_ref().map(|a| a.label.as_str())
    }

    /// Endpoint of the assigned operator.
    #[must_use]
    pub fn operator_uri(&self) -> Option<&str> {
        self.assigned.as_ref().map(|a| a.endpoint.as_str())
    }

    /// Overwrites the assignment. Idempotent.
    ///
    /// # Errors
    ///
    /// - `OperatorError::Unauthorized` if the caller is not the administrator
    /// - `OperatorError::InvalidInput` for malformed label or endpoint
    pub fn set_operator(
        &mut self,
        ctx: &CallContext,
        label: &str,
        address: Address,
        endpoint: &str,
    ) -> Result<OperatorEvent, OperatorError> {
        self.admin.ensure(ctx.caller)?;
        self.assigned = if address.is_open() {
            None
        } else {
            Some(OperatorEntry::new(label, address, endpoint)?)
        };
        Ok(OperatorEvent::OperatorSet {
            label: label.to_string(),
            address,
            endpoint: endpoint.to_string(),
        })
    }
}

impl AccessGate for MutableStrategy {
    fn operator(&self, _height: u64) -> Address {
        self.assigned.as_ref().map_or(Address::OPEN, |a| a.address)
    }
}
