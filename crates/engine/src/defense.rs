use dashmap::DashMap;
use powgate_common::{FloorDifficulty, PowgateError, PowgateResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One step of a captcha's escalation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefenseLevel {
    /// Visitor count at which this level takes effect.
    pub threshold: u32,
    /// Proof-of-work difficulty handed out at this level.
    pub difficulty: u32,
}

impl DefenseLevel {
    pub fn new(threshold: u32, difficulty: u32) -> Self {
        Self {
            threshold,
            difficulty,
        }
    }
}

/// Validated escalation table and visitor window for a single captcha.
///
/// Levels are kept sorted by strictly ascending threshold and
/// non-decreasing difficulty, so resolution is a binary search and the
/// first level always carries the lowest difficulty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefenseConfig {
    captcha_id: String,
    levels: Vec<DefenseLevel>,
    window: Duration,
}

impl DefenseConfig {
    /// Build a config, rejecting tables that cannot be resolved
    /// unambiguously.
    pub fn new(
        captcha_id: impl Into<String>,
        levels: Vec<DefenseLevel>,
        window: Duration,
    ) -> PowgateResult<Self> {
        let captcha_id = captcha_id.into();

        if levels.is_empty() {
            return Err(PowgateError::InvalidConfig(
                "at least one defense level is required".into(),
            ));
        }
        if window.is_zero() {
            return Err(PowgateError::InvalidConfig(
                "duration must be greater than zero".into(),
            ));
        }
        if let Some(level) = levels.iter().find(|l| l.difficulty == 0) {
            return Err(PowgateError::InvalidConfig(format!(
                "difficulty factor at threshold {} must be greater than zero",
                level.threshold
            )));
        }

        for pair in levels.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            if upper.threshold <= lower.threshold {
                return Err(PowgateError::InvalidConfig(format!(
                    "visitor thresholds must be unique and ascending ({} after {})",
                    upper.threshold, lower.threshold
                )));
            }
            if upper.difficulty < lower.difficulty {
                return Err(PowgateError::InvalidConfig(format!(
                    "difficulty factor decreases from {} to {} at threshold {}",
                    lower.difficulty, upper.difficulty, upper.threshold
                )));
            }
        }

        Ok(Self {
            captcha_id,
            levels,
            window,
        })
    }

    pub fn captcha_id(&self) -> &str {
        &self.captcha_id
    }

    pub fn levels(&self) -> &[DefenseLevel] {
        &self.levels
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn lowest_difficulty(&self) -> u32 {
        self.levels[0].difficulty
    }

    /// Resolve the difficulty for a visitor count.
    ///
    /// Picks the level with the largest threshold not above `count`. When
    /// the count is below every threshold the floor policy decides; a fixed
    /// floor is capped at the lowest configured difficulty so difficulty
    /// never drops as the count rises.
    pub fn difficulty_for(&self, count: u64, floor: FloorDifficulty) -> u32 {
        let qualifying = self
            .levels
            .partition_point(|l| u64::from(l.threshold) <= count);
        if qualifying == 0 {
            match floor {
                FloorDifficulty::LowestLevel => self.lowest_difficulty(),
                FloorDifficulty::Fixed(difficulty) => difficulty.min(self.lowest_difficulty()),
            }
        } else {
            self.levels[qualifying - 1].difficulty
        }
    }
}

/// Concurrent registry of defense configs keyed by captcha id.
pub struct DefenseStore {
    configs: DashMap<String, Arc<DefenseConfig>>,
}

impl DefenseStore {
    pub fn new() -> Self {
        Self {
            configs: DashMap::new(),
        }
    }

    /// Insert or wholesale replace the config for `captcha_id`.
    ///
    /// Counters and challenges already running keep the window they
    /// captured when they were created.
    pub fn register(
        &self,
        captcha_id: &str,
        levels: Vec<DefenseLevel>,
        window: Duration,
    ) -> PowgateResult<()> {
        let config = match DefenseConfig::new(captcha_id, levels, window) {
            Ok(config) => config,
            Err(e) => {
                warn!(captcha_id = %captcha_id, error = %e, "rejected defense config");
                return Err(e);
            }
        };

        let levels = config.levels.len();
        let replaced = self
            .configs
            .insert(captcha_id.to_string(), Arc::new(config))
            .is_some();

        info!(
            captcha_id = %captcha_id,
            levels,
            window_secs = window.as_secs_f64(),
            replaced,
            "registered defense config"
        );
        Ok(())
    }

    pub fn exists(&self, captcha_id: &str) -> bool {
        self.configs.contains_key(captcha_id)
    }

    /// Fetch a shared handle to the current config.
    pub fn get(&self, captcha_id: &str) -> PowgateResult<Arc<DefenseConfig>> {
        self.configs
            .get(captcha_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(PowgateError::CaptchaNotFound)
    }

    /// Remove the config only. Returns whether one was present.
    pub fn delete(&self, captcha_id: &str) -> bool {
        let removed = self.configs.remove(captcha_id).is_some();
        if removed {
            info!(captcha_id = %captcha_id, "deleted defense config");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl Default for DefenseStore {
    fn default() -> Self {
        Self::new()
    }
}
