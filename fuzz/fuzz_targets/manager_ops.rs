//! Fuzz harness for operator manager call sequences.
//!
//! Each input byte pair is decoded into one administrative or operator call
//! against a round-robin and a semaphore manager. Calls must never panic,
//! failed calls must leave the strategy untouched, and resolution must stay
//! consistent with the registry.

#![no_main]
use std::num::NonZeroU64;

use libfuzzer_sys::fuzz_target;
use opman_core::{
    AccessGate, Address, CallContext, OperatorManager, RoundRobinStrategy, SemaphoreStrategy,
};

const OWNER: u64 = 0xa0;

fn step(manager: &mut OperatorManager, op: u8, arg: u8, height: u64) {
    let relayer = Address::from_low_u64(u64::from(arg % 8) + 1);
    let caller = if arg & 0x80 == 0 {
        Address::from_low_u64(OWNER)
    } else {
        relayer
    };
    let ctx = CallContext::new(caller, height);
    let before = manager.strategy().clone();

    let failed = match op % 7 {
        0 => manager
            .add_operator(&ctx, &format!("REL-{arg:03}"), relayer, "")
            .is_err(),
        1 => manager.remove_operator(&ctx, &relayer).is_err(),
        2 => manager.set_maintenance(&ctx, arg & 1 == 1).is_err(),
        3 => manager.claim(&CallContext::new(relayer, height)).is_err(),
        4 => manager.lock_operator(&CallContext::new(relayer, height)).is_err(),
        5 => manager.unlock(&ctx).is_err(),
        _ => manager.transfer_ownership(&ctx, Address::from_low_u64(OWNER)).is_err(),
    };
    if failed {
        assert_eq!(manager.strategy(), &before);
    }

    let operator = manager.operator(height);
    if !operator.is_open() {
        assert!(manager.is_operator(&operator, height));
        let registered = manager.registry().is_some_and(|r| r.contains(&operator));
        // A semaphore holder may have been deregistered after locking.
        assert!(registered || manager.lock_state(height).is_ok());
    }
}

fuzz_target!(|data: &[u8]| {
    let owner = Address::from_low_u64(OWNER);
    let (Ok(rr), Ok(sem)) = (
        RoundRobinStrategy::new(owner, NonZeroU64::MIN),
        SemaphoreStrategy::new(owner, NonZeroU64::new(3).unwrap_or(NonZeroU64::MIN)),
    ) else {
        return;
    };
    let mut managers = [OperatorManager::new(rr), OperatorManager::new(sem)];

    let mut height = 0u64;
    for chunk in data.chunks_exact(2) {
        height += u64::from(chunk[0] >> 6);
        for manager in &mut managers {
            step(manager, chunk[0], chunk[1], height);
        }
    }
});
