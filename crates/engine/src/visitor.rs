use dashmap::DashMap;
use powgate_common::{FloorDifficulty, PowgateResult, WindowPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::defense::DefenseStore;

/// Internal state for a single captcha's visitor window.
struct CounterState {
    count: u64,
    window_start: Instant,
    /// Captured from the defense config when the window opened.
    window: Duration,
}

impl CounterState {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_start: now,
            window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.window
    }
}

/// Count and difficulty observed by one `add_visitor` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorSnapshot {
    pub count: u64,
    pub difficulty: u32,
    /// Window of the counter that was incremented.
    pub window: Duration,
}

/// Concurrent per-captcha visitor counter with passive window expiry.
///
/// There is no cleanup thread: an expired window is detected and discarded
/// by the next `add_visitor` or `get_count` on the same captcha. Windows of
/// captchas that are never touched again are dropped by [`purge_expired`],
/// which also runs every [`PURGE_INTERVAL`] visits.
///
/// [`purge_expired`]: VisitorCounter::purge_expired
pub struct VisitorCounter {
    counters: DashMap<String, CounterState>,
    policy: WindowPolicy,
    floor: FloorDifficulty,
    visits: AtomicUsize,
}

/// Number of recorded visits between two automatic purges.
pub const PURGE_INTERVAL: usize = 1024;

impl VisitorCounter {
    pub fn new(policy: WindowPolicy, floor: FloorDifficulty) -> Self {
        Self {
            counters: DashMap::new(),
            policy,
            floor,
            visits: AtomicUsize::new(0),
        }
    }

    /// Record one visit to `captcha_id` and resolve its difficulty.
    ///
    /// Fails with `CaptchaNotFound` before touching the counter when the
    /// captcha has no registered config.
    pub fn add_visitor(
        &self,
        defense: &DefenseStore,
        captcha_id: &str,
    ) -> PowgateResult<VisitorSnapshot> {
        // The config handle is cloned out so no two map locks are ever held
        // together.
        let config = defense.get(captcha_id)?;
        let now = Instant::now();

        let (count, window) = {
            let mut entry = self
                .counters
                .entry(captcha_id.to_string())
                .or_insert_with(|| CounterState::fresh(now, config.window()));

            let state = entry.value_mut();
            if state.is_expired(now) {
                debug!(
                    captcha_id = %captcha_id,
                    stale_count = state.count,
                    "visitor window elapsed, starting fresh"
                );
                *state = CounterState::fresh(now, config.window());
            }

            state.count = state.count.saturating_add(1);
            if self.policy == WindowPolicy::Sliding {
                state.window_start = now;
            }

            (state.count, state.window)
        };

        // Entry lock is released here; retain must not run under it.
        if self.visits.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge_expired();
        }

        let difficulty = config.difficulty_for(count, self.floor);
        debug!(captcha_id = %captcha_id, count, difficulty, "visitor added");

        Ok(VisitorSnapshot {
            count,
            difficulty,
            window,
        })
    }

    /// Current visitor count, or 0 when the captcha has no live window.
    pub fn get_count(&self, captcha_id: &str) -> u64 {
        let now = Instant::now();

        if self
            .counters
            .remove_if(captcha_id, |_, state| state.is_expired(now))
            .is_some()
        {
            debug!(captcha_id = %captcha_id, "reclaimed expired visitor window");
            return 0;
        }

        self.counters
            .get(captcha_id)
            .filter(|state| !state.is_expired(now))
            .map(|state| state.count)
            .unwrap_or(0)
    }

    /// Drop every expired window. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.counters.retain(|_, state| {
            let keep = !state.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        debug!(removed, remaining = self.counters.len(), "purged expired visitor windows");
        removed
    }

    /// Number of tracked windows, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
