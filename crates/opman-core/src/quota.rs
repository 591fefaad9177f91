//! Daily throughput quota for the protected resource.
//!
//! The quota caps the aggregate amount admitted per calendar window,
//! independent of which operator submits. It is consulted after the
//! operator gate, so the two controls compose.
//!
//! The window index is `timestamp / window_secs`. Spending resets whenever
//! the index changes; there is no background reset task.
//!
//! `check` is read-only and `charge` commits. A caller that checks, then
//! fails for another reason, leaves the quota untouched.

use serde::{Deserialize, Serialize};

use crate::error::QuotaError;

/// Default window width: one day.
pub const DEFAULT_WINDOW_SECS: u64 = 86_400;

/// Amount-based admission over calendar windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuota {
    limit: u64,
    window_secs: u64,
    window: u64,
    spent: u64,
}

impl DailyQuota {
    /// Creates a quota admitting `limit` per day.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self::with_window(limit, DEFAULT_WINDOW_SECS)
    }

    /// Creates a quota admitting `limit` per `window_secs`. A zero window is
    /// treated as one second.
    #[must_use]
    pub const fn with_window(limit: u64, window_secs: u64) -> Self {
        Self {
            limit,
            window_secs: if window_secs == 0 { 1 } else { window_secs },
            window: 0,
            spent: 0,
        }
    }

    /// Returns the per-window limit.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns the window width in seconds.
    #[must_use]
    pub const fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Returns the window index for `timestamp`.
    #[must_use]
    pub const fn window_index(&self, timestamp: u64) -> u64 {
        timestamp / self.window_secs
    }

    /// Returns how much was spent in the window containing `timestamp`.
    #[must_use]
    pub const fn spent(&self, timestamp: u64) -> u64 {
        if self.window_index(timestamp) == self.window {
            self.spent
        } else {
            0
        }
    }

    /// Returns what is left in the window containing `timestamp`.
    #[must_use]
    pub const fn remaining(&self, timestamp: u64) -> u64 {
        self.limit.saturating_sub(self.spent(timestamp))
    }

    /// Checks that `amount` fits without recording it.
    ///
    /// # Errors
    ///
    /// Returns `QuotaError::QuotaExceeded` if it does not fit.
    pub const fn check(&self, amount: u64, timestamp: u64) -> Result<(), QuotaError> {
        let remaining = self.remaining(timestamp);
        if amount > remaining {
            return Err(QuotaError::QuotaExceeded {
                requested: amount,
                remaining,
            });
        }
        Ok(())
    }

    /// Records `amount` against the window containing `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns `QuotaError::QuotaExceeded` if it does not fit; nothing is
    /// recorded in that case.
    pub fn charge(&mut self, amount: u64, timestamp: u64) -> Result<(), QuotaError> {
        self.check(amount, timestamp)?;
        let window = self.window_index(timestamp);
        if window != self.window {
            tracing::debug!(
                previous_window = self.window,
                window,
                "quota window rolled over"
            );
            self.window = window;
            self.spent = 0;
        }
        self.spent += amount;
        Ok(())
    }
}
