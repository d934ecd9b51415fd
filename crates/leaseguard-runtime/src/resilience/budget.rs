//! Judgment budget.
//!
//! Pair count grows quadratically with clause count; the budget caps how many
//! pair judgments a single analysis may send to the oracle. Retries inside a
//! judgment are not charged separately.

use std::sync::atomic::{AtomicU32, Ordering};

/// Per-analysis cap on pair judgments. `None` means unlimited.
#[derive(Debug)]
pub struct CallBudget {
    max_calls: Option<u32>,
    used: AtomicU32,
}

impl CallBudget {
    pub fn new(max_calls: Option<u32>) -> Self {
        Self {
            max_calls,
            used: AtomicU32::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Reserve one judgment. Returns false when the budget is spent.
    pub fn try_acquire(&self) -> bool {
        match self.max_calls {
            None => {
                self.used.fetch_add(1, Ordering::SeqCst);
                true
            }
            Some(max) => self
                .used
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                    (used < max).then_some(used + 1)
                })
                .is_ok(),
        }
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    /// Remaining calls, or `None` if unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.max_calls.map(|max| max.saturating_sub(self.used()))
    }
}
