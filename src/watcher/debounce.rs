//! Per-resource rebuild debouncing
//!
//! Every change event resets its resource's pending timer, so a burst of
//! edits yields exactly one rebuild after a quiet period.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Quiet period before a pending rebuild fires
pub const DEBOUNCE_MS: u64 = 500;

/// Scheduler with an explicit reset-and-reschedule operation keyed by
/// resource name
#[derive(Debug)]
pub struct DebounceScheduler {
    window: Duration,
    pending: HashMap<String, Instant>,
}

impl DebounceScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Schedule (or push back) the rebuild for a resource. Returns true when
    /// the resource had no pending rebuild yet.
    pub fn reset(&mut self, resource: &str) -> bool {
        self.pending
            .insert(resource.to_string(), Instant::now() + self.window)
            .is_none()
    }

    /// Pop every resource whose quiet period has elapsed, in name order.
    pub fn due(&mut self) -> Vec<String> {
        let now = Instant::now();
        let mut ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(name, _)| name.clone())
            .collect();
        ready.sort();

        for name in &ready {
            self.pending.remove(name);
        }
        ready
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
