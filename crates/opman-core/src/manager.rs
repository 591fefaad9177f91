//! The operator manager and its shared handle.
//!
//! [`OperatorManager`] owns exactly one [`Strategy`] and routes
//! administrative and operator calls to it. Successful mutations are
//! journaled as [`RecordedEvent`]s and logged.
//!
//! [`SharedGate`] is the handle a protected resource holds. It exposes reads
//! to the resource and writes to administrators, and it is the mutual
//! exclusion boundary that keeps authorization-check-then-act atomic when
//! callers genuinely race:
//!
//! ```text
//! admin ──write──┐
//!                ├── RwLock<OperatorManager>
//! pool  ──read───┘     (guard held across check + execute)
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::admin::CallContext;
use crate::error::OperatorError;
use crate::events::{OperatorEvent, RecordedEvent};
use crate::gate::AccessGate;
use crate::identity::Address;
use crate::registry::OperatorRegistry;
use crate::strategy::{
    ClaimOutcome, LockState, MutableStrategy, RoundRobinStrategy, ScheduledSlot,
    SemaphoreStrategy, Strategy, StrategyKind,
};

/// Maximum number of undrained events kept in the journal.
pub const MAX_JOURNAL_EVENTS: usize = 4096;

/// Routes calls to one fixed strategy and journals the resulting events.
#[derive(Debug, Clone)]
pub struct OperatorManager {
    strategy: Strategy,
    journal: VecDeque<RecordedEvent>,
}

impl OperatorManager {
    /// Wraps `strategy`. The strategy cannot be replaced afterwards.
    #[must_use]
    pub fn new(strategy: impl Into<Strategy>) -> Self {
        Self {
            strategy: strategy.into(),
            journal: VecDeque::new(),
        }
    }

    /// Returns the configured strategy.
    #[must_use]
    pub const fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Returns which strategy is configured.
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Returns the administrator.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.strategy.admin().owner()
    }

    /// Returns the registry, if the strategy keeps one.
    #[must_use]
    pub const fn registry(&self) -> Option<&OperatorRegistry> {
        self.strategy.registry()
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Returns the slot index at `height`.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Unsupported` unless the strategy is round-robin.
    pub fn current_slot(&self, height: u64) -> Result<u64, OperatorError> {
        Ok(self.round_robin("current_slot")?.current_slot(height))
    }

    /// Returns the rotation table for `from..=to`.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Unsupported` unless the strategy is round-robin.
    pub fn schedule(&self, from: u64, to: u64) -> Result<Vec<ScheduledSlot>, OperatorError> {
        Ok(self.round_robin("schedule")?.schedule(from, to))
    }

    /// Returns the active semaphore lock at `height`.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Unsupported` unless the strategy is semaphore.
    pub fn lock_state(&self, height: u64) -> Result<Option<LockState>, OperatorError> {
        Ok(self.semaphore("lock_state")?.lock_state(height).copied())
    }

    /// Returns the label of the operator resolved at `height`, if known.
    #[must_use]
    pub fn operator_name(&self, height: u64) -> Option<&str> {
        match &self.strategy {
            Strategy::Mutable(s) => s.operator_name(),
            Strategy::RoundRobin(_) | Strategy::Semaphore(_) => {
                let op = self.operator(height);
                self.registry()?.get(&op).map(|e| e.label.as_str())
            },
        }
    }

    /// Returns the endpoint of the operator resolved at `height`, if known.
    #[must_use]
    pub fn operator_uri(&self, height: u64) -> Option<&str> {
        match &self.strategy {
            Strategy::Mutable(s) => s.operator_uri(),
            Strategy::RoundRobin(_) | Strategy::Semaphore(_) => {
                let op = self.operator(height);
                self.registry()?.get(&op).map(|e| e.endpoint.as_str())
            },
        }
    }

    // =========================================================================
    // Administrative calls
    // =========================================================================

    /// Registers an operator.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `DuplicateOperator`, `InvalidInput`, or `Unsupported`
    /// for the mutable strategy.
    pub fn add_operator(
        &mut self,
        ctx: &CallContext,
        label: &str,
        address: Address,
        endpoint: &str,
    ) -> Result<(), OperatorError> {
        let unsupported = self.unsupported("add_operator");
        let event = match &mut self.strategy {
            Strategy::RoundRobin(s) => s.add_operator(ctx, label, address, endpoint),
            Strategy::Semaphore(s) => s.add_operator(ctx, label, address, endpoint),
            Strategy::Mutable(_) => Err(unsupported),
        };
        self.commit(ctx, "add_operator", event)
    }

    /// Deregisters an operator.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, or `Unsupported` for the mutable strategy.
    pub fn remove_operator(
        &mut self,
        ctx: &CallContext,
        address: &Address,
    ) -> Result<(), OperatorError> {
        let unsupported = self.unsupported("remove_operator");
        let event = match &mut self.strategy {
            Strategy::RoundRobin(s) => s.remove_operator(ctx, address),
            Strategy::Semaphore(s) => s.remove_operator(ctx, address),
            Strategy::Mutable(_) => Err(unsupported),
        };
        self.commit(ctx, "remove_operator", event)
    }

    /// Switches maintenance mode.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, or `Unsupported` unless the strategy is round-robin.
    pub fn set_maintenance(
        &mut self,
        ctx: &CallContext,
        enabled: bool,
    ) -> Result<(), OperatorError> {
        let event = self
            .round_robin_mut("set_maintenance")
            .and_then(|s| s.set_maintenance(ctx, enabled));
        self.commit(ctx, "set_maintenance", event)
    }

    /// Overwrites the mutable assignment.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InvalidInput`, or `Unsupported` unless the strategy
    /// is mutable.
    pub fn set_operator(
        &mut self,
        ctx: &CallContext,
        label: &str,
        address: Address,
        endpoint: &str,
    ) -> Result<(), OperatorError> {
        let event = self
            .mutable_mut("set_operator")
            .and_then(|s| s.set_operator(ctx, label, address, endpoint));
        self.commit(ctx, "set_operator", event)
    }

    /// Releases the semaphore lock early. Returns `true` if a lock was held.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, or `Unsupported` unless the strategy is semaphore.
    pub fn unlock(&mut self, ctx: &CallContext) -> Result<bool, OperatorError> {
        let released = self.semaphore_mut("unlock").and_then(|s| s.unlock(ctx));
        match released {
            Ok(Some(event)) => {
                self.record(ctx, "unlock", event);
                Ok(true)
            },
            Ok(None) => Ok(false),
            Err(e) => Err(self.reject(ctx, "unlock", e)),
        }
    }

    /// Moves the administrator capability.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the caller is not the administrator, `InvalidInput`
    /// if `new_owner` is the open sentinel.
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<(), OperatorError> {
        let event = self
            .strategy
            .admin_mut()
            .transfer(ctx.caller, new_owner)
            .map(|previous| OperatorEvent::OwnershipTransferred {
                previous,
                owner: new_owner,
            });
        self.commit(ctx, "transfer_ownership", event)
    }

    // =========================================================================
    // Operator calls
    // =========================================================================

    /// Records liveness for the current round-robin slot.
    ///
    /// # Errors
    ///
    /// `MaintenanceActive`, or `Unsupported` unless the strategy is
    /// round-robin.
    pub fn claim(&mut self, ctx: &CallContext) -> Result<ClaimOutcome, OperatorError> {
        let outcome = self.round_robin_mut("claim").and_then(|s| s.claim(ctx));
        match outcome {
            Ok(ClaimOutcome::Recorded { slot, scheduled }) => {
                self.record(
                    ctx,
                    "claim",
                    OperatorEvent::Claimed {
                        slot,
                        claimant: ctx.caller,
                        scheduled,
                    },
                );
                Ok(ClaimOutcome::Recorded { slot, scheduled })
            },
            Ok(already @ ClaimOutcome::AlreadyClaimed { slot }) => {
                tracing::debug!(caller = %ctx.caller, slot, "slot already claimed");
                Ok(already)
            },
            Ok(stale @ ClaimOutcome::Superseded { slot, latest }) => {
                tracing::debug!(
                    caller = %ctx.caller,
                    slot,
                    latest,
                    "claim for an older slot ignored"
                );
                Ok(stale)
            },
            Err(e) => Err(self.reject(ctx, "claim", e)),
        }
    }

    /// Takes the semaphore lock for the caller.
    ///
    /// # Errors
    ///
    /// `AlreadyLocked`, `NotRegistered`, or `Unsupported` unless the strategy
    /// is semaphore.
    pub fn lock_operator(&mut self, ctx: &CallContext) -> Result<(), OperatorError> {
        let event = self
            .semaphore_mut("lock_operator")
            .and_then(|s| s.lock_operator(ctx));
        self.commit(ctx, "lock_operator", event)
    }

    // =========================================================================
    // Journal
    // =========================================================================

    /// Returns undrained events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &RecordedEvent> {
        self.journal.iter()
    }

    /// Removes and returns all undrained events, oldest first.
    pub fn drain_events(&mut self) -> Vec<RecordedEvent> {
        self.journal.drain(..).collect()
    }

    fn commit(
        &mut self,
        ctx: &CallContext,
        operation: &'static str,
        result: Result<OperatorEvent, OperatorError>,
    ) -> Result<(), OperatorError> {
        match result {
            Ok(event) => {
                self.record(ctx, operation, event);
                Ok(())
            },
            Err(e) => Err(self.reject(ctx, operation, e)),
        }
    }

    fn record(&mut self, ctx: &CallContext, operation: &'static str, event: OperatorEvent) {
        tracing::info!(
            strategy = %self.kind(),
            operation,
            event_type = event.event_type(),
            caller = %ctx.caller,
            height = ctx.height,
            "operator manager state changed"
        );
        if self.journal.len() >= MAX_JOURNAL_EVENTS {
            self.journal.pop_front();
        }
        self.journal.push_back(RecordedEvent {
            height: ctx.height,
            event,
        });
    }

    fn reject(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        err: OperatorError,
    ) -> OperatorError {
        tracing::debug!(
            strategy = %self.kind(),
            operation,
            caller = %ctx.caller,
            height = ctx.height,
            code = err.code(),
            error = %err,
            "operator manager call rejected"
        );
        err
    }

    const fn unsupported(&self, operation: &'static str) -> OperatorError {
        OperatorError::Unsupported {
            operation,
            strategy: self.strategy.kind(),
        }
    }

    fn round_robin(&self, operation: &'static str) -> Result<&RoundRobinStrategy, OperatorError> {
        match &self.strategy {
            Strategy::RoundRobin(s) => Ok(s),
            _ => Err(self.unsupported(operation)),
        }
    }

    fn semaphore(&self, operation: &'static str) -> Result<&SemaphoreStrategy, OperatorError> {
        match &self.strategy {
            Strategy::Semaphore(s) => Ok(s),
            _ => Err(self.unsupported(operation)),
        }
    }

    fn round_robin_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut RoundRobinStrategy, OperatorError> {
        let err = self.unsupported(operation);
        match &mut self.strategy {
            Strategy::RoundRobin(s) => Ok(s),
            _ => Err(err),
        }
    }

    fn semaphore_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut SemaphoreStrategy, OperatorError> {
        let err = self.unsupported(operation);
        match &mut self.strategy {
            Strategy::Semaphore(s) => Ok(s),
            _ => Err(err),
        }
    }

    fn mutable_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut MutableStrategy, OperatorError> {
        let err = self.unsupported(operation);
        match &mut self.strategy {
            Strategy::Mutable(s) => Ok(s),
            _ => Err(err),
        }
    }
}

impl AccessGate for OperatorManager {
    fn operator(&self, height: u64) -> Address {
        self.strategy.operator(height)
    }

    fn is_live(&self, candidate: &Address, height: u64) -> bool {
        self.strategy.is_live(candidate, height)
    }
}

/// Shared handle over an [`OperatorManager`].
///
/// Clones share the same manager. Reads may run concurrently; an
/// administrative write waits for in-flight reads and blocks new ones, so
/// every read observes either all or none of a mutation.
#[derive(Debug, Clone)]
pub struct SharedGate {
    inner: Arc<RwLock<OperatorManager>>,
}

impl SharedGate {
    /// Wraps `manager`.
    #[must_use]
    pub fn new(manager: OperatorManager) -> Self {
        Self {
            inner: Arc::new(RwLock::new(manager)),
        }
    }

    /// Acquires a read view. Administrative writes wait until it is dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, OperatorManager> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs an administrative or operator call against the manager.
    pub fn admin<T>(&self, f: impl FnOnce(&mut OperatorManager) -> T) -> T {
        let mut manager = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut manager)
    }

    /// Returns which strategy is configured.
    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        self.read().kind()
    }
}

impl AccessGate for SharedGate {
    fn operator(&self, height: u64) -> Address {
        self.read().operator(height)
    }

    fn is_operator(&self, candidate: &Address, height: u64) -> bool {
        self.read().is_operator(candidate, height)
    }

    fn is_live(&self, candidate: &Address, height: u64) -> bool {
        self.read().is_live(candidate, height)
    }
}
