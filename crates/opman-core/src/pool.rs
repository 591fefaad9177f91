//! The protected resource: a transaction pool gated by an operator manager.
//!
//! # Admission order
//!
//! ```text
//! transact(caller, batch)
//!   1. operator gate     is_operator(caller, height)   -> Unauthorized
//!   2. liveness (opt.)   is_live(caller, height)       -> NotClaimed
//!   3. daily quota       check(amount, timestamp)      -> QuotaExceeded
//!   4. execute           BatchExecutor::execute        -> Rejected
//!   5. charge quota
//! ```
//!
//! A failure at any step leaves the pool exactly as before the call. The
//! pool only reads from the gate.
//!
//! # Concurrency
//!
//! Submissions are serialized by the pool mutex, and the gate read guard is
//! held from step 1 through step 5, so an administrative change lands either
//! wholly before or wholly after a submission. Two callers racing for the
//! same slot are ordered by who acquires the mutex first; only the one the
//! gate resolves to succeeds.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::clock::ChainView;
use crate::error::{OperatorError, PoolError};
use crate::gate::AccessGate;
use crate::identity::Address;
use crate::manager::SharedGate;
use crate::quota::DailyQuota;

/// A batch of transactions submitted by a relayer.
///
/// The pool looks only at `amount`; the payload belongs to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBatch {
    /// Caller-chosen identifier, for receipts and logs.
    pub id: u64,
    /// Amount counted against the daily quota.
    pub amount: u64,
    /// Opaque batch contents.
    pub payload: Vec<u8>,
}

/// Proof that a batch was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactReceipt {
    /// The batch identifier.
    pub batch_id: u64,
    /// Who submitted it.
    pub operator: Address,
    /// Height of acceptance.
    pub height: u64,
    /// Quota left in the current window after this batch.
    pub quota_remaining: u64,
}

/// Business logic behind the gate: validation, proofs, balances.
pub trait BatchExecutor: Send + Sync {
    /// Applies `batch`. Returning `Err` rejects it without side effects.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the batch is invalid.
    fn execute(&self, caller: &Address, batch: &TransactionBatch) -> Result<(), String>;
}

/// Pool construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolOptions {
    /// Require the operator to have claimed the current slot before acting.
    /// Only meaningful with a gate that tracks liveness.
    pub require_claim: bool,
}

#[derive(Debug)]
struct PoolState {
    quota: DailyQuota,
    accepted: u64,
}

/// A transaction pool whose entry point is gated by an operator manager.
pub struct Pool<E> {
    gate: SharedGate,
    chain: Arc<dyn ChainView>,
    executor: E,
    options: PoolOptions,
    state: Mutex<PoolState>,
}

impl<E: BatchExecutor> Pool<E> {
    /// Wires a pool to `gate`. The gate cannot be swapped later.
    pub fn new(
        gate: SharedGate,
        chain: Arc<dyn ChainView>,
        executor: E,
        quota: DailyQuota,
        options: PoolOptions,
    ) -> Self {
        Self {
            gate,
            chain,
            executor,
            options,
            state: Mutex::new(PoolState { quota, accepted: 0 }),
        }
    }

    /// Returns the gate this pool consults.
    #[must_use]
    pub const fn gate(&self) -> &SharedGate {
        &self.gate
    }

    /// Returns the executor behind the gate.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Returns the number of accepted batches.
    #[must_use]
    pub fn accepted(&self) -> u64 {
        self.lock_state().accepted
    }

    /// Returns the quota left at the chain's current timestamp.
    #[must_use]
    pub fn quota_remaining(&self) -> u64 {
        self.lock_state().quota.remaining(self.chain.timestamp())
    }

    /// The gated entry point.
    ///
    /// # Errors
    ///
    /// - `PoolError::Operator` if the caller is not the resolved operator
    /// - `PoolError::NotClaimed` if a claim is required and missing
    /// - `PoolError::Quota` if the daily quota would be exceeded
    /// - `PoolError::Rejected` if the executor refuses the batch
    pub fn transact(
        &self,
        caller: Address,
        batch: &TransactionBatch,
    ) -> Result<TransactReceipt, PoolError> {
        let mut state = self.lock_state();
        let manager = self.gate.read();
        let height = self.chain.height();
        let timestamp = self.chain.timestamp();

        if !manager.is_operator(&caller, height) {
            let operator = manager.operator(height);
            tracing::warn!(
                caller = %caller,
                operator = %operator,
                height,
                batch_id = batch.id,
                "transact rejected: caller is not the operator"
            );
            return Err(OperatorError::unauthorized(
                caller,
                format!("is not the operator at height {height} (operator is {operator})"),
            )
            .into());
        }

        if self.options.require_claim && !manager.is_live(&caller, height) {
            let slot = manager.current_slot(height).unwrap_or(height);
            tracing::warn!(caller = %caller, slot, "transact rejected: slot not claimed");
            return Err(PoolError::NotClaimed { caller, slot });
        }

        state.quota.check(batch.amount, timestamp).inspect_err(|e| {
            tracing::warn!(batch_id = batch.id, error = %e, "transact rejected by quota");
        })?;

        self.executor
            .execute(&caller, batch)
            .map_err(|reason| PoolError::Rejected {
                batch_id: batch.id,
                reason,
            })?;

        state.quota.charge(batch.amount, timestamp)?;
        state.accepted += 1;
        drop(manager);

        tracing::debug!(
            caller = %caller,
            height,
            batch_id = batch.id,
            amount = batch.amount,
            "batch accepted"
        );

        Ok(TransactReceipt {
            batch_id: batch.id,
            operator: caller,
            height,
            quota_remaining: state.quota.remaining(timestamp),
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::admin::CallContext;
    use crate::clock::ManualChain;
    use crate::manager::OperatorManager;
    use crate::strategy::{MutableStrategy, RoundRobinStrategy};

    struct Counting(AtomicU64);

    impl BatchExecutor for Counting {
        fn execute(&self, _caller: &Address, batch: &TransactionBatch) -> Result<(), String> {
            if batch.payload.is_empty() {
                return Err("empty payload".to_string());
            }
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn owner() -> Address {
        Address::from_low_u64(0xa0)
    }

    fn relayer(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn batch(id: u64, amount: u64) -> TransactionBatch {
        TransactionBatch {
            id,
            amount,
            payload: vec![1],
        }
    }

    fn mutable_pool(limit: u64) -> (Pool<Counting>, Arc<ManualChain>) {
        let initial = crate::registry::OperatorEntry::new("REL-01", relayer(1), "").unwrap();
        let manager = OperatorManager::new(MutableStrategy::new(owner(), Some(initial)).unwrap());
        let chain = Arc::new(ManualChain::new(0, 1_000));
        let pool = Pool::new(
            SharedGate::new(manager),
            chain.clone(),
            Counting(AtomicU64::new(0)),
            DailyQuota::new(limit),
            PoolOptions::default(),
        );
        (pool, chain)
    }

    #[test]
    fn operator_passes_others_fail() {
        let (pool, _) = mutable_pool(100);
        let receipt = pool.transact(relayer(1), &batch(1, 10)).unwrap();
        assert_eq!(receipt.quota_remaining, 90);
        assert!(matches!(
            pool.transact(relayer(2), &batch(2, 10)),
            Err(PoolError::Operator(OperatorError::Unauthorized { .. }))
        ));
        assert_eq!(pool.accepted(), 1);
    }

    #[test]
    fn unauthorized_does_not_touch_quota() {
        let (pool, _) = mutable_pool(100);
        let _ = pool.transact(relayer(2), &batch(1, 60));
        assert_eq!(pool.quota_remaining(), 100);
    }

    #[test]
    fn quota_is_checked_after_operator() {
        let (pool, _) = mutable_pool(15);
        pool.transact(relayer(1), &batch(1, 10)).unwrap();
        assert!(matches!(
            pool.transact(relayer(1), &batch(2, 10)),
            Err(PoolError::Quota(_))
        ));
        assert_eq!(pool.executor.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn quota_resets_next_day() {
        let (pool, chain) = mutable_pool(10);
        pool.transact(relayer(1), &batch(1, 10)).unwrap();
        chain.set_timestamp(1_000 + crate::quota::DEFAULT_WINDOW_SECS);
        assert!(pool.transact(relayer(1), &batch(2, 10)).is_ok());
    }

    #[test]
    fn executor_rejection_is_atomic() {
        let (pool, _) = mutable_pool(100);
        let bad = TransactionBatch {
            id: 7,
            amount: 50,
            payload: Vec::new(),
        };
        assert!(matches!(
            pool.transact(relayer(1), &bad),
            Err(PoolError::Rejected { batch_id: 7, .. })
        ));
        assert_eq!(pool.quota_remaining(), 100);
        assert_eq!(pool.accepted(), 0);
    }

    #[test]
    fn claim_requirement_blocks_stale_operator() {
        let mut rr = RoundRobinStrategy::new(owner(), NonZeroU64::new(1).unwrap()).unwrap();
        let admin = CallContext::new(owner(), 0);
        rr.add_operator(&admin, "REL-01", relayer(1), "").unwrap();
        rr.set_maintenance(&admin, false).unwrap();
        let gate = SharedGate::new(OperatorManager::new(rr));
        let chain = Arc::new(ManualChain::new(0, 0));
        let pool = Pool::new(
            gate.clone(),
            chain,
            Counting(AtomicU64::new(0)),
            DailyQuota::new(u64::MAX),
            PoolOptions {
                require_claim: true,
            },
        );

        assert!(matches!(
            pool.transact(relayer(1), &batch(1, 1)),
            Err(PoolError::NotClaimed { slot: 0, .. })
        ));
        gate.admin(|m| m.claim(&CallContext::new(relayer(1), 0)))
            .unwrap();
        assert!(pool.transact(relayer(1), &batch(2, 1)).is_ok());
    }
}
