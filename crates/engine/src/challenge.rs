use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use powgate_common::{PowgateError, PowgateResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Records are unique per (captcha id, challenge string).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ChallengeKey {
    captcha_id: String,
    challenge_id: String,
}

impl ChallengeKey {
    fn new(captcha_id: &str, challenge_id: &str) -> Self {
        Self {
            captcha_id: captcha_id.to_string(),
            challenge_id: challenge_id.to_string(),
        }
    }
}

/// A short-lived puzzle instance issued for one captcha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub captcha_id: String,
    pub challenge_id: String,
    pub difficulty: u32,
    pub window: Duration,
    pub created_at: Instant,
}

impl Challenge {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.window
    }
}

/// Concurrent store of issued challenges with passive expiry.
///
/// Every operation goes through the map's entry lock for its key, so an
/// add racing a delete on the same key resolves to one of the two orders.
/// Records nobody asks for again are dropped by `purge_expired`, which also
/// runs every [`PURGE_INTERVAL`] issued challenges.
pub struct ChallengeStore {
    challenges: DashMap<ChallengeKey, Challenge>,
    consume_on_read: bool,
    issued: AtomicUsize,
}

/// Number of issued challenges between two automatic purges.
pub const PURGE_INTERVAL: usize = 1024;

impl ChallengeStore {
    pub fn new(consume_on_read: bool) -> Self {
        Self {
            challenges: DashMap::new(),
            consume_on_read,
            issued: AtomicUsize::new(0),
        }
    }

    /// Issue a challenge. A live record under the same key is a duplicate;
    /// an expired one is replaced.
    pub fn add_challenge(
        &self,
        captcha_id: &str,
        challenge_id: &str,
        difficulty: u32,
        window: Duration,
    ) -> PowgateResult<()> {
        if window.is_zero() {
            return Err(PowgateError::InvalidConfig(
                "challenge duration must be greater than zero".into(),
            ));
        }

        let now = Instant::now();
        let challenge = Challenge {
            captcha_id: captcha_id.to_string(),
            challenge_id: challenge_id.to_string(),
            difficulty,
            window,
            created_at: now,
        };

        match self.challenges.entry(ChallengeKey::new(captcha_id, challenge_id)) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_expired(now) {
                    return Err(PowgateError::DuplicateChallenge);
                }
                debug!(
                    captcha_id = %captcha_id,
                    challenge_id = %challenge_id,
                    "replacing expired challenge"
                );
                entry.insert(challenge);
            }
            Entry::Vacant(entry) => {
                entry.insert(challenge);
            }
        }

        debug!(captcha_id = %captcha_id, challenge_id = %challenge_id, difficulty, "challenge issued");

        if self.issued.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge_expired();
        }
        Ok(())
    }

    /// Fetch a live challenge. With consume-on-read enabled the record is
    /// removed in the same step.
    pub fn get_challenge(&self, captcha_id: &str, challenge_id: &str) -> PowgateResult<Challenge> {
        let now = Instant::now();

        match self.challenges.entry(ChallengeKey::new(captcha_id, challenge_id)) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                entry.remove();
                debug!(captcha_id = %captcha_id, challenge_id = %challenge_id, "challenge expired");
                Err(PowgateError::ChallengeNotFound)
            }
            Entry::Occupied(entry) => {
                if self.consume_on_read {
                    Ok(entry.remove())
                } else {
                    Ok(entry.get().clone())
                }
            }
            Entry::Vacant(_) => Err(PowgateError::ChallengeNotFound),
        }
    }

    /// Remove a live challenge. Absent and expired records both fail.
    pub fn delete_challenge(&self, captcha_id: &str, challenge_id: &str) -> PowgateResult<()> {
        let now = Instant::now();

        match self.challenges.entry(ChallengeKey::new(captcha_id, challenge_id)) {
            Entry::Occupied(entry) => {
                let expired = entry.get().is_expired(now);
                entry.remove();
                if expired {
                    Err(PowgateError::ChallengeNotFound)
                } else {
                    Ok(())
                }
            }
            Entry::Vacant(_) => Err(PowgateError::ChallengeNotFound),
        }
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.challenges.retain(|_, challenge| {
            let keep = !challenge.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        debug!(removed, remaining = self.challenges.len(), "purged expired challenges");
        removed
    }

    /// Number of stored records, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}
