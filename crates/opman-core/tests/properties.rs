//! Property-based tests over random administrative call sequences.
//!
//! Each generated sequence is replayed against a round-robin manager and a
//! semaphore manager. After every call the resolution rules are checked
//! against the manager's public views.

use std::num::NonZeroU64;

use opman_core::{
    AccessGate, Address, CallContext, OperatorError, OperatorManager, RoundRobinStrategy,
    SemaphoreStrategy, Strategy,
};
use proptest::prelude::*;
use proptest::strategy::Strategy as _;

const OWNER: u64 = 0xa0;

#[derive(Debug, Clone)]
enum Call {
    Add { as_admin: bool, relayer: u64 },
    Remove { as_admin: bool, relayer: u64 },
    Maintenance { as_admin: bool, enabled: bool },
    Claim { relayer: u64 },
    Lock { relayer: u64 },
    Unlock { as_admin: bool },
}

fn call() -> impl proptest::strategy::Strategy<Value = Call> {
    prop_oneof![
        (any::<bool>(), 1u64..6).prop_map(|(as_admin, relayer)| Call::Add { as_admin, relayer }),
        (any::<bool>(), 1u64..6)
            .prop_map(|(as_admin, relayer)| Call::Remove { as_admin, relayer }),
        (any::<bool>(), any::<bool>())
            .prop_map(|(as_admin, enabled)| Call::Maintenance { as_admin, enabled }),
        (1u64..6).prop_map(|relayer| Call::Claim { relayer }),
        (1u64..6).prop_map(|relayer| Call::Lock { relayer }),
        any::<bool>().prop_map(|as_admin| Call::Unlock { as_admin }),
    ]
}

fn caller(as_admin: bool, relayer: u64) -> Address {
    if as_admin {
        Address::from_low_u64(OWNER)
    } else {
        Address::from_low_u64(relayer)
    }
}

fn apply(manager: &mut OperatorManager, call: &Call, height: u64) -> Result<(), OperatorError> {
    match *call {
        Call::Add { as_admin, relayer } => manager.add_operator(
            &CallContext::new(caller(as_admin, relayer), height),
            &format!("REL-{relayer:02}"),
            Address::from_low_u64(relayer),
            "",
        ),
        Call::Remove { as_admin, relayer } => manager.remove_operator(
            &CallContext::new(caller(as_admin, relayer), height),
            &Address::from_low_u64(relayer),
        ),
        Call::Maintenance { as_admin, enabled } => {
            manager.set_maintenance(&CallContext::new(caller(as_admin, 9), height), enabled)
        },
        Call::Claim { relayer } => manager
            .claim(&CallContext::new(Address::from_low_u64(relayer), height))
            .map(|_| ()),
        Call::Lock { relayer } => {
            manager.lock_operator(&CallContext::new(Address::from_low_u64(relayer), height))
        },
        Call::Unlock { as_admin } => manager
            .unlock(&CallContext::new(caller(as_admin, 9), height))
            .map(|_| ()),
    }
}

fn replay(
    mut manager: OperatorManager,
    calls: &[(Call, u64)],
    mut check: impl FnMut(&OperatorManager, &Call, u64, &Result<(), OperatorError>),
) -> Result<(), TestCaseError> {
    let mut height = 0u64;
    for (call, delta) in calls {
        height += delta;
        let before = manager.strategy().clone();
        let journal_before = manager.events().count();

        let result = apply(&mut manager, call, height);

        if result.is_err() {
            prop_assert_eq!(manager.strategy(), &before, "failed {:?} changed state", call);
            prop_assert_eq!(manager.events().count(), journal_before);
        }
        if let Call::Add { as_admin: false, .. } | Call::Remove { as_admin: false, .. } = call {
            prop_assert!(
                matches!(result, Err(OperatorError::Unauthorized { .. })),
                "non-admin {:?} returned {:?}",
                call,
                result
            );
        }
        check(&manager, call, height, &result);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Round-robin: resolution is the pure rotation formula, or open while
    /// frozen or empty.
    #[test]
    fn prop_round_robin_resolution(
        slot_duration in 1u64..5,
        calls in prop::collection::vec((call(), 0u64..4), 0..40),
    ) {
        let owner = Address::from_low_u64(OWNER);
        let rr = RoundRobinStrategy::new(owner, NonZeroU64::new(slot_duration).unwrap()).unwrap();
        let mut violations = Vec::new();

        replay(OperatorManager::new(rr), &calls, |manager, _call, height, _result| {
            let Strategy::RoundRobin(rr) = manager.strategy() else {
                unreachable!("round-robin manager");
            };
            for h in height..height + 8 {
                let expected = if rr.is_maintenance() || rr.registry().is_empty() {
                    Address::OPEN
                } else {
                    let n = rr.registry().len() as u64;
                    let index = usize::try_from((h / slot_duration) % n).unwrap();
                    rr.registry().entries()[index].address
                };
                if manager.operator(h) != expected {
                    violations.push((h, manager.operator(h), expected));
                }
            }
        })?;

        prop_assert!(violations.is_empty(), "resolution mismatches: {:?}", violations);
    }

    /// Round-robin: maintenance opens the gate for every caller.
    #[test]
    fn prop_maintenance_opens_gate(
        relayers in prop::collection::btree_set(1u64..50, 0..10),
        height in any::<u64>(),
        probe in any::<u64>(),
    ) {
        let owner = Address::from_low_u64(OWNER);
        let admin = CallContext::new(owner, 0);
        let mut manager =
            OperatorManager::new(RoundRobinStrategy::new(owner, NonZeroU64::MIN).unwrap());
        for r in &relayers {
            manager
                .add_operator(&admin, &format!("REL-{r}"), Address::from_low_u64(*r), "")
                .unwrap();
        }
        manager.set_maintenance(&admin, true).unwrap();

        prop_assert!(manager.operator(height).is_open());
        prop_assert!(manager.is_operator(&Address::from_low_u64(probe), height));
    }

    /// Semaphore: at most one holder, and only inside its window.
    #[test]
    fn prop_semaphore_single_holder(
        lock_duration in 1u64..6,
        calls in prop::collection::vec((call(), 0u64..4), 0..40),
    ) {
        let owner = Address::from_low_u64(OWNER);
        let sem =
            SemaphoreStrategy::new(owner, NonZeroU64::new(lock_duration).unwrap()).unwrap();
        let mut violations = Vec::new();

        replay(OperatorManager::new(sem), &calls, |manager, call, height, result| {
            let op = manager.operator(height);
            match manager.lock_state(height).unwrap() {
                Some(lock) => {
                    if op != lock.holder || !lock.is_active_at(height) {
                        violations.push(format!("{call:?} at {height}: {op} vs {lock:?}"));
                    }
                    if !manager.operator(lock.expires_at).is_open() {
                        violations.push(format!("lock {lock:?} does not lapse"));
                    }
                },
                None => {
                    if !op.is_open() {
                        violations.push(format!("{call:?} at {height}: unlocked but {op}"));
                    }
                },
            }
            if let (Call::Lock { .. }, Ok(())) = (call, result) {
                let lock = manager.lock_state(height).unwrap();
                if lock.map(|l| l.acquired_at) != Some(height) {
                    violations.push(format!("lock at {height} not recorded"));
                }
            }
        })?;

        prop_assert!(violations.is_empty(), "{:?}", violations);
    }
}
