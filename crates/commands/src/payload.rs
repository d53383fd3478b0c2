//! JSON shapes exchanged at the command boundary.
//!
//! Durations travel as whole seconds; the engine only ever sees
//! [`Duration`] and typed levels.

use powgate_common::{LevelConfig, PowgateResult};
use powgate_engine::{Challenge, DefenseConfig, DefenseLevel, VisitorSnapshot};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `ADD_CAPTCHA` config argument, also returned by `GET_CAPTCHA`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaPayload {
    pub levels: Vec<LevelConfig>,
    pub duration: u64,
}

impl CaptchaPayload {
    pub fn parse(json: &str) -> PowgateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn defense_levels(&self) -> Vec<DefenseLevel> {
        to_defense_levels(&self.levels)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.duration)
    }
}

impl From<&DefenseConfig> for CaptchaPayload {
    fn from(config: &DefenseConfig) -> Self {
        Self {
            levels: config
                .levels()
                .iter()
                .map(|l| LevelConfig {
                    visitor_threshold: l.threshold,
                    difficulty_factor: l.difficulty,
                })
                .collect(),
            duration: config.window().as_secs(),
        }
    }
}

pub fn to_defense_levels(levels: &[LevelConfig]) -> Vec<DefenseLevel> {
    levels
        .iter()
        .map(|l| DefenseLevel::new(l.visitor_threshold, l.difficulty_factor))
        .collect()
}

/// `ADD_CHALLENGE` payload argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengePayload {
    pub difficulty: u32,
    pub duration: u64,
    pub challenge: String,
}

impl ChallengePayload {
    pub fn parse(json: &str) -> PowgateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// `ADD_VISITOR` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorReply {
    pub count: u64,
    pub difficulty_factor: u32,
    pub duration: u64,
}

impl From<VisitorSnapshot> for VisitorReply {
    fn from(snapshot: VisitorSnapshot) -> Self {
        Self {
            count: snapshot.count,
            difficulty_factor: snapshot.difficulty,
            duration: snapshot.window.as_secs(),
        }
    }
}

/// `GET_CHALLENGE` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeReply {
    pub difficulty_factor: u32,
    pub duration: u64,
}

impl From<&Challenge> for ChallengeReply {
    fn from(challenge: &Challenge) -> Self {
        Self {
            difficulty_factor: challenge.difficulty,
            duration: challenge.window.as_secs(),
        }
    }
}
