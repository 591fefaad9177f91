//! Administrator capability and call context.

use serde::{Deserialize, Serialize};

use crate::error::OperatorError;
use crate::identity::Address;

/// Who is calling, and at which height.
///
/// Every mutating operation takes one of these. The height is the external
/// counter at the moment the call is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// The calling identity.
    pub caller: Address,
    /// Height at which the call executes.
    pub height: u64,
}

impl CallContext {
    /// Creates a call context.
    #[must_use]
    pub const fn new(caller: Address, height: u64) -> Self {
        Self { caller, height }
    }
}

/// The single administrator allowed to mutate a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCapability {
    owner: Address,
}

impl AdminCapability {
    /// Creates a capability held by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::InvalidInput` if `owner` is the open sentinel.
    pub fn new(owner: Address) -> Result<Self, OperatorError> {
        if owner.is_open() {
            return Err(OperatorError::invalid_input(
                "owner",
                "administrator cannot be the open sentinel",
            ));
        }
        Ok(Self { owner })
    }

    /// Returns the current administrator.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Checks that `caller` holds the capability.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Unauthorized` otherwise.
    pub fn ensure(&self, caller: Address) -> Result<(), OperatorError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(OperatorError::unauthorized(
                caller,
                "is not the administrator",
            ))
        }
    }

    /// Hands the capability to `new_owner`. Returns the previous owner.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Unauthorized` if `caller` is not the current
    /// owner, or `OperatorError::InvalidInput` if `new_owner` is the open
    /// sentinel.
    pub fn transfer(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<Address, OperatorError> {
        self.ensure(caller)?;
        let next = Self::new(new_owner)?;
        let previous = self.owner;
        *self = next;
        Ok(previous)
    }
}
