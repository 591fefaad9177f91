//! Deterministic round-robin rotation.
//!
//! The authorized operator is a pure function of height, registry and slot
//! width:
//!
//! ```text
//! slot     = height / slot_duration
//! operator = registry[slot mod registry.len()].address
//! ```
//!
//! Nothing about the rotation is stored, so it cannot drift when heights pass
//! without any call. The only stored state besides the registry is the
//! maintenance flag and the claim table.
//!
//! # State Machine
//!
//! ```text
//! Maintenance --set_maintenance(false)--> Active(slot)
//! Active(s)   --height crosses boundary--> Active(s')   (derived, not stored)
//! Active(s)   --set_maintenance(true)---> Maintenance
//! ```
//!
//! A fresh strategy starts in `Maintenance`. While in maintenance, or while
//! the registry is empty, the gate resolves to the open sentinel.
//!
//! # Claims
//!
//! `claim` is a liveness signal anyone may send. It never changes who is
//! authorized. Re-claiming in the same slot is a no-op, and so is claiming an
//! older slot than the one already on record.

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::admin::{AdminCapability, CallContext};
use crate::clock::SlotClock;
use crate::error::OperatorError;
use crate::events::OperatorEvent;
use crate::gate::AccessGate;
use crate::identity::Address;
use crate::registry::{OperatorEntry, OperatorRegistry};

/// Maximum number of distinct claimants tracked at once.
pub const MAX_TRACKED_CLAIMANTS: usize = 1024;

/// Maximum number of slots returned by [`RoundRobinStrategy::schedule`].
pub const MAX_SCHEDULE_SLOTS: u64 = 4096;

/// Result of a successful `claim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimOutcome {
    /// The claim was recorded for `slot`.
    Recorded {
        /// The claimed slot.
        slot: u64,
        /// Whether the claimant is the scheduled operator for `slot`.
        scheduled: bool,
    },
    /// The claimant had already claimed `slot`; nothing changed.
    AlreadyClaimed {
        /// The claimed slot.
        slot: u64,
    },
    /// The claimant already holds a claim for a later slot; nothing changed.
    Superseded {
        /// The slot the call asked for.
        slot: u64,
        /// The later slot already on record.
        latest: u64,
    },
}

/// One row of a rotation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSlot {
    /// Slot index.
    pub slot: u64,
    /// First height of the slot.
    pub start_height: u64,
    /// Operator for the slot, or the open sentinel.
    pub operator: Address,
}

/// Round-robin operator rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRobinStrategy {
    admin: AdminCapability,
    clock: SlotClock,
    registry: OperatorRegistry,
    maintenance: bool,
    /// Latest claimed slot per claimant.
    claims: BTreeMap<Address, u64>,
}

impl RoundRobinStrategy {
    /// Creates a strategy owned by `owner`, starting in maintenance.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::InvalidInput` if `owner` is the open sentinel.
    pub fn new(owner: Address, slot_duration: NonZeroU64) -> Result<Self, OperatorError> {
        Ok(Self {
            admin: AdminCapability::new(owner)?,
            clock: SlotClock::new(slot_duration),
            registry: OperatorRegistry::new(),
            maintenance: true,
            claims: BTreeMap::new(),
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

    /// Returns the slot clock.
    #[must_use]
    pub const fn clock(&self) -> &SlotClock {
        &self.clock
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Returns `true` while in maintenance.
    #[must_use]
    pub const fn is_maintenance(&self) -> bool {
        self.maintenance
    }

    /// Returns the slot containing `height`.
    #[must_use]
    pub const fn current_slot(&self, height: u64) -> u64 {
        self.clock.slot(height)
    }

    /// Returns the registry entry scheduled for `slot`, ignoring maintenance.
    #[must_use]
    pub fn entry_for_slot(&self, slot: u64) -> Option<&OperatorEntry> {
        let n = self.registry.len() as u64;
        if n == 0 {
            return None;
        }
        let index = usize::try_from(slot % n).ok()?;
        self.registry.at(index)
    }

    /// Returns the operator scheduled at `height`, or the open sentinel.
    #[must_use]
    pub fn scheduled_operator(&self, height: u64) -> Address {
        if self.maintenance {
            return Address::OPEN;
        }
        self.entry_for_slot(self.current_slot(height))
            .map_or(Address::OPEN, |e| e.address)
    }

    /// Lists the rotation for every slot touching `from..=to`.
    ///
    /// At most [`MAX_SCHEDULE_SLOTS`] rows are returned.
    #[must_use]
    pub fn schedule(&self, from: u64, to: u64) -> Vec<ScheduledSlot> {
        if from > to {
            return Vec::new();
        }
        let first = self.clock.slot(from);
        let last = self
            .clock
            .slot(to)
            .min(first.saturating_add(MAX_SCHEDULE_SLOTS - 1));

        (first..=last)
            .map(|slot| {
                let start_height = self.clock.slot_start(slot);
                ScheduledSlot {
                    slot,
                    start_height,
                    operator: self.scheduled_operator(start_height),
                }
            })
            .collect()
    }

    /// Returns `true` if `claimant` has claimed `slot`.
    #[must_use]
    pub fn has_claimed(&self, claimant: &Address, slot: u64) -> bool {
        self.claims.get(claimant) == Some(&slot)
    }

    /// Registers an operator at the end of the rotation.
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

    /// Removes an operator. The rotation modulus shrinks immediately.
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
        self.claims.remove(address);
        Ok(OperatorEvent::OperatorRemoved {
            label: removed.label,
            address: removed.address,
        })
    }

    /// Switches maintenance mode.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::Unauthorized` if the caller is not the
    /// administrator.
    pub fn set_maintenance(
        &mut self,
        ctx: &CallContext,
        enabled: bool,
    ) -> Result<OperatorEvent, OperatorError> {
        self.admin.ensure(ctx.caller)?;
        self.maintenance = enabled;
        Ok(OperatorEvent::MaintenanceChanged { enabled })
    }

    /// Records that the caller is live in the current slot.
    ///
    /// Claims only move forward: a claim for a slot older than the caller's
    /// latest is a no-op. When the table is full, claims for past slots are
    /// pruned first, then the oldest claim that is not the scheduled
    /// operator's own is evicted.
    ///
    /// # Errors
    ///
    /// Returns `OperatorError::MaintenanceActive` while in maintenance.
    pub fn claim(&mut self, ctx: &CallContext) -> Result<ClaimOutcome, OperatorError> {
        if self.maintenance {
            return Err(OperatorError::MaintenanceActive { operation: "claim" });
        }

        let slot = self.current_slot(ctx.height);
        match self.claims.get(&ctx.caller) {
            Some(&latest) if latest == slot => {
                return Ok(ClaimOutcome::AlreadyClaimed { slot });
            },
            Some(&latest) if latest > slot => {
                return Ok(ClaimOutcome::Superseded { slot, latest });
            },
            _ => {},
        }

        if !self.claims.contains_key(&ctx.caller) && self.claims.len() >= MAX_TRACKED_CLAIMANTS {
            self.claims.retain(|_, claimed| *claimed >= slot);
            if self.claims.len() >= MAX_TRACKED_CLAIMANTS {
                self.evict_one_claim();
            }
        }

        self.claims.insert(ctx.caller, slot);
        let scheduled = self.scheduled_operator(ctx.height) == ctx.caller;
        Ok(ClaimOutcome::Recorded { slot, scheduled })
    }

    fn evict_one_claim(&mut self) {
        let victim = self
            .claims
            .iter()
            .min_by_key(|&(claimant, &claimed)| {
                let scheduled = self
                    .entry_for_slot(claimed)
                    .is_some_and(|e| e.address == *claimant);
                (scheduled, claimed, *claimant)
            })
            .map(|(claimant, _)| *claimant);
        if let Some(victim) = victim {
            self.claims.remove(&victim);
        }
    }
}

impl AccessGate for RoundRobinStrategy {
    fn operator(&self, height: u64) -> Address {
        self.scheduled_operator(height)
    }

    fn is_live(&self, candidate: &Address, height: u64) -> bool {
        let op = self.scheduled_operator(height);
        op.is_open() || self.has_claimed(candidate, self.current_slot(height))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const OWNER: u64 = 0xa0;

    fn owner() -> Address {
        Address::from_low_u64(OWNER)
    }

    fn relayer(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn admin_ctx() -> CallContext {
        CallContext::new(owner(), 0)
    }

    fn strategy(slot_duration: u64, relayers: u64) -> RoundRobinStrategy {
        let mut rr =
            RoundRobinStrategy::new(owner(), NonZeroU64::new(slot_duration).unwrap()).unwrap();
        for n in 1..=relayers {
            rr.add_operator(
                &admin_ctx(),
                &format!("REL-{n:02}"),
                relayer(n),
                "https://relayer.example/",
            )
            .unwrap();
        }
        rr.set_maintenance(&admin_ctx(), false).unwrap();
        rr
    }

    #[test]
    fn starts_in_maintenance_and_open() {
        let rr = RoundRobinStrategy::new(owner(), NonZeroU64::new(1).unwrap()).unwrap();
        assert!(rr.is_maintenance());
        assert_eq!(rr.operator(0), Address::OPEN);
    }

    #[test]
    fn rotation_wraps_around() {
        let rr = strategy(1, 3);
        assert_eq!(rr.operator(0), relayer(1));
        assert_eq!(rr.operator(1), relayer(2));
        assert_eq!(rr.operator(2), relayer(3));
        assert_eq!(rr.operator(3), relayer(1));
    }

    #[test]
    fn wider_slots_hold_operator() {
        let rr = strategy(4, 2);
        for h in 0..4 {
            assert_eq!(rr.operator(h), relayer(1));
        }
        for h in 4..8 {
            assert_eq!(rr.operator(h), relayer(2));
        }
    }

    #[test]
    fn empty_registry_fails_open() {
        let rr = strategy(1, 0);
        assert!(!rr.is_maintenance());
        assert_eq!(rr.operator(17), Address::OPEN);
        assert!(rr.is_operator(&relayer(9), 17));
    }

    #[test]
    fn maintenance_resolves_open() {
        let mut rr = strategy(1, 3);
        rr.set_maintenance(&admin_ctx(), true).unwrap();
        for h in 0..6 {
            assert_eq!(rr.operator(h), Address::OPEN);
        }
    }

    #[test]
    fn only_scheduled_operator_passes() {
        let rr = strategy(1, 3);
        assert!(rr.is_operator(&relayer(2), 1));
        assert!(!rr.is_operator(&relayer(1), 1));
        assert!(!rr.is_operator(&relayer(3), 1));
    }

    #[test]
    fn non_admin_mutations_rejected() {
        let mut rr = strategy(1, 1);
        let ctx = CallContext::new(relayer(1), 0);
        assert!(matches!(
            rr.add_operator(&ctx, "X", relayer(5), ""),
            Err(OperatorError::Unauthorized { .. })
        ));
        assert!(matches!(
            rr.remove_operator(&ctx, &relayer(1)),
            Err(OperatorError::Unauthorized { .. })
        ));
        assert!(matches!(
            rr.set_maintenance(&ctx, true),
            Err(OperatorError::Unauthorized { .. })
        ));
        assert_eq!(rr.registry().len(), 1);
        assert!(!rr.is_maintenance());
    }

    #[test]
    fn removal_shrinks_modulus_immediately() {
        let mut rr = strategy(1, 3);
        rr.remove_operator(&admin_ctx(), &relayer(2)).unwrap();
        assert_eq!(rr.operator(0), relayer(1));
        assert_eq!(rr.operator(1), relayer(3));
        assert_eq!(rr.operator(2), relayer(1));
    }

    #[test]
    fn claim_is_idempotent_within_slot() {
        let mut rr = strategy(2, 2);
        let ctx = CallContext::new(relayer(1), 0);
        assert_eq!(
            rr.claim(&ctx).unwrap(),
            ClaimOutcome::Recorded {
                slot: 0,
                scheduled: true
            }
        );
        let again = CallContext::new(relayer(1), 1);
        assert_eq!(
            rr.claim(&again).unwrap(),
            ClaimOutcome::AlreadyClaimed { slot: 0 }
        );
        assert!(rr.has_claimed(&relayer(1), 0));
    }

    #[test]
    fn claim_does_not_change_operator() {
        let mut rr = strategy(1, 3);
        let ctx = CallContext::new(relayer(3), 0);
        assert_eq!(
            rr.claim(&ctx).unwrap(),
            ClaimOutcome::Recorded {
                slot: 0,
                scheduled: false
            }
        );
        assert_eq!(rr.operator(0), relayer(1));
    }

    #[test]
    fn claim_rejected_in_maintenance() {
        let mut rr = strategy(1, 2);
        rr.set_maintenance(&admin_ctx(), true).unwrap();
        assert_eq!(
            rr.claim(&CallContext::new(relayer(1), 0)),
            Err(OperatorError::MaintenanceActive { operation: "claim" })
        );
    }

    #[test]
    fn liveness_requires_claim_in_current_slot() {
        let mut rr = strategy(1, 2);
        assert!(!rr.is_live(&relayer(1), 0));
        rr.claim(&CallContext::new(relayer(1), 0)).unwrap();
        assert!(rr.is_live(&relayer(1), 0));
        // A claim from slot 0 does not carry over to slot 2.
        assert!(!rr.is_live(&relayer(1), 2));
    }

    #[test]
    fn stale_claims_are_pruned_when_table_fills() {
        let mut rr = strategy(1, 1);
        for n in 0..MAX_TRACKED_CLAIMANTS as u64 {
            rr.claim(&CallContext::new(Address::from_low_u64(1000 + n), 0))
                .unwrap();
        }
        assert!(rr.claim(&CallContext::new(relayer(1), 1)).is_ok());
        assert!(rr.has_claimed(&relayer(1), 1));
        assert!(!rr.has_claimed(&Address::from_low_u64(1000), 0));
    }

    #[test]
    fn full_slot_evicts_oldest_unscheduled_claim() {
        let mut rr = strategy(1, 1);
        // relayer(1) is scheduled for every slot and claims first.
        rr.claim(&CallContext::new(relayer(1), 0)).unwrap();
        for n in 1..MAX_TRACKED_CLAIMANTS as u64 {
            rr.claim(&CallContext::new(Address::from_low_u64(1000 + n), 0))
                .unwrap();
        }

        let latecomer = Address::from_low_u64(5000);
        assert_eq!(
            rr.claim(&CallContext::new(latecomer, 0)).unwrap(),
            ClaimOutcome::Recorded {
                slot: 0,
                scheduled: false
            }
        );
        assert!(rr.has_claimed(&latecomer, 0));
        assert!(rr.has_claimed(&relayer(1), 0));
        assert!(rr.is_live(&relayer(1), 0));
        assert!(!rr.has_claimed(&Address::from_low_u64(1001), 0));
    }

    #[test]
    fn older_claim_does_not_overwrite_newer() {
        let mut rr = strategy(1, 2);
        rr.claim(&CallContext::new(relayer(1), 10)).unwrap();
        let before = rr.clone();
        assert_eq!(
            rr.claim(&CallContext::new(relayer(1), 4)).unwrap(),
            ClaimOutcome::Superseded {
                slot: 4,
                latest: 10
            }
        );
        assert_eq!(rr, before);
        assert!(rr.is_live(&relayer(1), 10));
    }

    #[test]
    fn schedule_lists_rotation() {
        let rr = strategy(2, 3);
        let rows = rr.schedule(0, 7);
        let ops: Vec<_> = rows.iter().map(|r| r.operator).collect();
        assert_eq!(ops, [relayer(1), relayer(2), relayer(3), relayer(1)]);
        assert_eq!(rows[3].start_height, 6);
        assert!(rr.schedule(5, 4).is_empty());
    }

    #[test]
    fn schedule_is_bounded() {
        let rr = strategy(1, 2);
        assert_eq!(rr.schedule(0, u64::MAX).len() as u64, MAX_SCHEDULE_SLOTS);
    }

    proptest! {
        /// Property: operator(h) == registry[(h / d) mod n].address.
        #[test]
        fn prop_operator_is_pure_function_of_height(
            d in 1u64..50,
            n in 1u64..12,
            h in 0u64..1_000_000,
        ) {
            let rr = strategy(d, n);
            let expected = rr.registry().at(((h / d) % n) as usize).unwrap().address;
            prop_assert_eq!(rr.operator(h), expected);
        }

        /// Property: an empty registry always resolves open.
        #[test]
        fn prop_empty_registry_is_open(d in 1u64..50, h in any::<u64>()) {
            let rr = strategy(d, 0);
            prop_assert!(rr.operator(h).is_open());
        }

        /// Property: exactly one registered operator passes the gate per height.
        #[test]
        fn prop_single_winner_per_height(
            d in 1u64..20,
            n in 1u64..8,
            h in 0u64..100_000,
        ) {
            let rr = strategy(d, n);
            let winners = (1..=n).filter(|k| rr.is_operator(&relayer(*k), h)).count();
            prop_assert_eq!(winners, 1);
        }
    }
}
