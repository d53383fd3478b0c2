//! Visitor counting and challenge issuance for proof-of-work captchas.
//!
//! Three stores sit behind the [`Engine`] handle:
//!
//! - **Defense configs** -- per-captcha escalation tables mapping visitor
//!   counts to difficulty factors.
//!
//! - **Visitor counters** -- per-captcha windowed counters. Each increment is
//!   applied exactly once under the key's entry lock and resolved against the
//!   captcha's defense config.
//!
//! - **Challenges** -- short-lived records keyed by captcha id and challenge
//!   string, rejected while a live duplicate exists.
//!
//! All three use [`DashMap`](dashmap::DashMap), which locks per shard:
//! unrelated keys only contend when they hash to the same shard, and then
//! only for the duration of one operation. Expiry is passive: stale counters
//! and challenges are discarded on the next access to their key, and
//! [`Engine::purge_expired`] drops the ones nobody touches again. There is
//! no sweeper thread.

pub mod challenge;
pub mod defense;
pub mod visitor;

use std::sync::Arc;
use std::time::Duration;

use powgate_common::{EngineConfig, PowgateResult};

pub use challenge::{Challenge, ChallengeStore};
pub use defense::{DefenseConfig, DefenseLevel, DefenseStore};
pub use visitor::{VisitorCounter, VisitorSnapshot};

/// Shared handle to the in-memory stores.
///
/// Cheaply cloneable (backed by `Arc`) and safe to share across tasks and
/// threads. Clones observe the same state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    defense: DefenseStore,
    visitors: VisitorCounter,
    challenges: ChallengeStore,
}

/// Raw entry counts per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub captchas: usize,
    pub counters: usize,
    pub challenges: usize,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        tracing::info!(
            window_policy = ?config.window_policy,
            floor = ?config.floor(),
            consume_challenge_on_read = config.consume_challenge_on_read,
            "creating captcha engine"
        );
        Self {
            inner: Arc::new(EngineInner {
                config,
                defense: DefenseStore::new(),
                visitors: VisitorCounter::new(config.window_policy, config.floor()),
                challenges: ChallengeStore::new(config.consume_challenge_on_read),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Register or replace the defense config of a captcha.
    pub fn register_captcha(
        &self,
        captcha_id: &str,
        levels: Vec<DefenseLevel>,
        window: Duration,
    ) -> PowgateResult<()> {
        self.inner.defense.register(captcha_id, levels, window)
    }

    pub fn captcha_exists(&self, captcha_id: &str) -> bool {
        self.inner.defense.exists(captcha_id)
    }

    pub fn get_captcha(&self, captcha_id: &str) -> PowgateResult<Arc<DefenseConfig>> {
        self.inner.defense.get(captcha_id)
    }

    /// Remove a captcha's config. Its counter and challenges live on until
    /// they expire.
    pub fn delete_captcha(&self, captcha_id: &str) -> bool {
        self.inner.defense.delete(captcha_id)
    }

    pub fn add_visitor(&self, captcha_id: &str) -> PowgateResult<VisitorSnapshot> {
        self.inner
            .visitors
            .add_visitor(&self.inner.defense, captcha_id)
    }

    pub fn get_count(&self, captcha_id: &str) -> u64 {
        self.inner.visitors.get_count(captcha_id)
    }

    pub fn add_challenge(
        &self,
        captcha_id: &str,
        challenge_id: &str,
        difficulty: u32,
        window: Duration,
    ) -> PowgateResult<()> {
        self.inner
            .challenges
            .add_challenge(captcha_id, challenge_id, difficulty, window)
    }

    pub fn get_challenge(&self, captcha_id: &str, challenge_id: &str) -> PowgateResult<Challenge> {
        self.inner.challenges.get_challenge(captcha_id, challenge_id)
    }

    pub fn delete_challenge(&self, captcha_id: &str, challenge_id: &str) -> PowgateResult<()> {
        self.inner
            .challenges
            .delete_challenge(captcha_id, challenge_id)
    }

    /// Drop expired visitor windows and challenges across all captchas.
    /// Returns the number of records removed.
    pub fn purge_expired(&self) -> usize {
        let removed = self.inner.visitors.purge_expired() + self.inner.challenges.purge_expired();
        if removed > 0 {
            tracing::info!(removed, "purged expired records");
        }
        removed
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            captchas: self.inner.defense.len(),
            counters: self.inner.visitors.len(),
            challenges: self.inner.challenges.len(),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
