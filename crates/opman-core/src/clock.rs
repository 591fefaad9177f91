//! Slot arithmetic over an external height counter.
//!
//! The height counter (block height) is supplied by a collaborator through
//! [`ChainView`]; this crate never advances it. A slot is the fixed-width
//! window `height / slot_duration`, so the slot index is a pure, monotonic
//! function of height.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Derives slot indices from heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotClock {
    slot_duration: NonZeroU64,
}

impl SlotClock {
    /// Creates a clock with the given slot width in heights.
    #[must_use]
    pub const fn new(slot_duration: NonZeroU64) -> Self {
        Self { slot_duration }
    }

    /// Returns the slot width.
    #[must_use]
    pub const fn slot_duration(&self) -> u64 {
        self.slot_duration.get()
    }

    /// Returns the slot containing `height`.
    #[must_use]
    pub const fn slot(&self, height: u64) -> u64 {
        height / self.slot_duration.get()
    }

    /// Returns the first height of `slot`, saturating at `u64::MAX`.
    #[must_use]
    pub const fn slot_start(&self, slot: u64) -> u64 {
        slot.saturating_mul(self.slot_duration.get())
    }

    /// Returns the first height of the slot after the one containing
    /// `height`, saturating at `u64::MAX`.
    #[must_use]
    pub const fn next_boundary(&self, height: u64) -> u64 {
        self.slot_start(self.slot(height).saturating_add(1))
    }
}

/// Read access to the externally ordered chain state.
///
/// Implementations must never report a height lower than one already
/// reported.
pub trait ChainView: Send + Sync {
    /// Current height.
    fn height(&self) -> u64;

    /// Current timestamp in seconds since the Unix epoch.
    fn timestamp(&self) -> u64;
}

/// A [`ChainView`] driven by hand, for tests and offline inspection.
#[derive(Debug, Default)]
pub struct ManualChain {
    height: AtomicU64,
    timestamp: AtomicU64,
}

impl ManualChain {
    /// Creates a chain view at the given height and timestamp.
    #[must_use]
    pub const fn new(height: u64, timestamp: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
            timestamp: AtomicU64::new(timestamp),
        }
    }

    /// Moves to `height`. Lower values are ignored to keep the view
    /// monotonic.
    pub fn set_height(&self, height: u64) {
        self.height.fetch_max(height, Ordering::AcqRel);
    }

    /// Advances the height by `delta`.
    pub fn advance(&self, delta: u64) {
        // fetch_update never fails with a closure that always returns Some.
        let _ = self
            .height
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |h| {
                Some(h.saturating_add(delta))
            });
    }

    /// Moves to `timestamp`. Lower values are ignored.
    pub fn set_timestamp(&self, timestamp: u64) {
        self.timestamp.fetch_max(timestamp, Ordering::AcqRel);
    }
}

impl ChainView for ManualChain {
    fn height(&self) -> u64 {
        self.height.load(Ordering::Acquire)
    }

    fn timestamp(&self) -> u64 {
        self.timestamp.load(Ordering::Acquire)
    }
}
