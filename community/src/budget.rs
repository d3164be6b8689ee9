use crate::{CommunityError, Result};
use std::time::{Duration, Instant};

/// Limits on the work a single run may do. The default is unlimited.
///
/// A pass is one Louvain local-moving pass, one asynchronous label
/// propagation pass, or one semi-synchronous round over all color classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    any(feature = "serde", test),
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Budget {
    /// Maximum number of passes. For Louvain the count restarts at every level.
    pub max_passes: Option<usize>,
    /// Wall-clock limit for the whole run.
    pub time_limit: Option<Duration>,
}

impl Budget {
    /// No limits.
    pub fn unlimited() -> Self {
        Budget::default()
    }

    /// Limit the number of passes.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = Some(max_passes);
        self
    }

    /// Limit the wall-clock time of a run.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    /// Start the clock for a run.
    pub fn start(&self) -> BudgetClock {
        BudgetClock {
            budget: *self,
            started: Instant::now(),
            passes: 0,
        }
    }
}

/// Running tally of the passes and time spent against a `Budget`.
#[derive(Debug, Clone)]
pub struct BudgetClock {
    budget: Budget,
    started: Instant,
    passes: usize,
}

impl BudgetClock {
    /// Call before starting a pass. Returns the number of the pass about to
    /// start, or `BudgetExhausted` if the pass is not allowed.
    pub fn check_pass(&mut self) -> Result<usize> {
        if let Some(max) = self.budget.max_passes {
            if self.passes >= max {
                return Err(CommunityError::BudgetExhausted {
                    passes: self.passes,
                });
            }
        }

        if let Some(limit) = self.budget.time_limit {
            if self.started.elapsed() >= limit {
                return Err(CommunityError::BudgetExhausted {
                    passes: self.passes,
                });
            }
        }

        self.passes += 1;
        Ok(self.passes)
    }

    /// Restart the pass count. The time limit keeps running.
    pub fn reset_passes(&mut self) {
        self.passes = 0;
    }

    /// Passes started since the last reset.
    pub fn passes(&self) -> usize {
        self.passes
    }
}
