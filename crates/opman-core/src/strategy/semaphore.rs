//! Exclusive, height-bounded operator lock.
//!
//! # State Machine
//!
//! ```text
//! Open --lock_operator()--> Locked(holder, expires_at)
//! Locked --height >= expires_at--> Open   (evaluated on read)
//! Locked --unlock() (admin)-------> Open
//! ```
//!
//! While locked, the gate resolves to the holder; while open, to the open
//! sentinel. There is no timer: expiry is recomputed on every access.
//!
//! Only registered identities may take the lock. Removing the holder from the
//! registry does not release the lock; it stays valid until it expires.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::admin::{AdminCapability, CallContext};
use crate::error::OperatorError;
use crate::events::OperatorEvent;
use crate::gate::AccessGate;
use crate::identity::Address;
use crate::registry::{OperatorEntry, OperatorRegistry};

/// An acquired lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    /// The identity holding the lock.
    pub holder: Address,
    /// Height at which the lock was taken.
    pub acquired_at: u64,
    /// First height at which the lock no longer applies.
    pub expires_at: u64,
}

impl LockState {
    /// Returns `true` if the lock applies at `height`.
    #[must_use]
    pub const fn is_active_at(&self, height: u64) -> bool {
        self.acquired_at <= height && height < self.expires_at
    }

    /// Returns `true` if the lock has not expired by `height`.
    ///
    /// Used for conflicts: a lock blocks new locks at every earlier height
    /// too, so a call carrying a stale height cannot displace it.
    #[must_use]
    pub const fn is_unexpired_at(&self, height: u64) -> bool {
        height < self.expires_at
    }
}

/// Semaphore-style operator manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemaphoreStrategy {
    admin: AdminCapability,
    registry: OperatorRegistry,
    lock_duration: NonZeroU64,
    lock: Option<LockState>,
}

impl SemaphoreStrategy {
    /// Creates an open semaphore owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::InvalidInput` if `owner` is the open sentinel.
    pub fn new(owner: Address, lock_duration: NonZeroU64) -> Result<Self, OperatorError> {
        Ok(Self {
            admin: AdminCapability::new(owner)?,
            registry: OperatorRegistry::new(),
            lock_duration,
            lock: None,
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

    /// Returns the registry of identities allowed to lock.
    #[must_use]
    pub const fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Returns how many heights a lock lasts.
    #[must_use]
    pub const fn lock_duration(&self) -> u64 {
        self.lock_duration.get()
    }

    /// Returns the lock in force at `height`, if any.
    #[must_use]
    pub fn lock_state(&self, height: u64) -> Option<&LockState> {
        self.lock.as_ref().filter(|l| l.is_active_at(height))
    }

    /// Registers an identity allowed to take the lock.
    ///
    /// # Errors
    ///
    /// - `OperatorError::Unauthorized` if the caller is not the administrator
    /// - `OperatorError::DuplicateOperator` if label or address is taken
    /// - `OperatorError::InvalidInput` for malformed fields or a full registry
    pub fn add_operator(
        &mut self,
        ctx: &CallContext,
        label: &str,
        address: Address,
        endpoint: &str,
    ) -> Result<OperatorEvent, OperatorError> {
        self.admin.ensure(ctx.caller)?;
        let entry = OperatorEntry::new(label, address, endpoint)?;
        self.registry.insert(entry.clone())?;
        Ok(OperatorEvent::OperatorAdded {
            label: entry.label,
            address: entry.address,
            endpoint: entry.endpoint,
        })
    }

    /// Deregisters an identity. An active lock it holds is kept.
    ///
    /// # Errors
    ///
    /// - `OperatorError::Unauthorized` if the caller is not the administrator
    /// - `OperatorError::NotFound` if `address` is not registered
    pub fn remove_operator(
        &mut self,
        ctx: &CallContext,
        address: &Address,
    ) -> Result<OperatorEvent, OperatorError> {
        self.admin.ensure(ctx.caller)?;
        let removed = self.registry.remove(address)?;
        Ok(OperatorEvent::OperatorRemoved {
            label: removed.label,
            address: removed.address,
        })
    }

    /// Takes the lock for the caller until `height + lock_duration`.
    ///
    /// # Errors
    ///
    /// - `OperatorError::AlreadyLocked` if any lock is unexpired at the call
    ///   height, whoever asks
    /// - `OperatorError::NotRegistered` if the caller is not registered
    pub fn lock_operator(&mut self, ctx: &CallContext) -> Result<OperatorEvent, OperatorError> {
        if let Some(active) = self.lock.filter(|l| l.is_unexpired_at(ctx.height)) {
            return Err(OperatorError::AlreadyLocked {
                holder: active.holder,
                expires_at: active.expires_at,
            });
        }
        if !self.registry.contains(&ctx.caller) {
            return Err(OperatorError::NotRegistered { caller: ctx.caller });
        }

        let lock = LockState {
            holder: ctx.caller,
            acquired_at: ctx.height,
            expires_at: ctx.height.saturating_add(self.lock_duration.get()),
        };
        self.lock = Some(lock);
        Ok(OperatorEvent::Locked {
            holder: lock.holder,
            acquired_at: lock.acquired_at,
            expires_at: lock.expires_at,
        })
    }

    /// Releases the active lock early. Returns `None` if nothing was held.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Unauthorized` if the caller is not the
    /// administrator.
    pub fn unlock(&mut self, ctx: &CallContext) -> Result<Option<OperatorEvent>, OperatorError> {
        self.admin.ensure(ctx.caller)?;
        let released = self
            .lock
            .take()
            .filter(|l| l.is_unexpired_at(ctx.height))
            .map(|l| OperatorEvent::Unlocked { holder: l.holder });
        Ok(released)
    }
}

impl AccessGate for SemaphoreStrategy {
    fn operator(&self, height: u64) -> Address {
        self.lock_state(height).map_or(Address::OPEN, |l| l.holder)
    }
}
