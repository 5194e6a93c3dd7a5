//! Engine configuration
//!
//! Every tunable has a default. The boost constants are empirical and are
//! kept here as named defaults.

use crate::types::AgeBucket;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tabs per Pass 1 / Pass 2 batch
    pub batch_size: usize,
    /// Pause between batches; zero still yields to the scheduler
    pub batch_delay: Duration,
    /// Cached results younger than this are reused
    pub cache_ttl: Duration,
    /// Run Pass 2 when at least this share of all tabs is uncertain
    pub pass2_min_uncertain_ratio: f32,
    /// Upper bound on a single dimension call; `None` waits indefinitely
    pub classify_timeout: Option<Duration>,
    /// Extracted text shorter than this goes straight to the default result
    pub min_feature_chars: usize,
    pub model_version: String,
    pub boost: BoostConfig,
    pub learning: LearningConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(200),
            cache_ttl: DAY,
            pass2_min_uncertain_ratio: 0.05,
            classify_timeout: Some(Duration::from_secs(30)),
            min_feature_chars: 3,
            model_version: "zero-shot-mnli".to_string(),
            boost: BoostConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `TABSENSE_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse::<usize>("TABSENSE_BATCH_SIZE") {
            config.batch_size = n.max(1);
        }
        if let Some(ms) = env_parse::<u64>("TABSENSE_BATCH_DELAY_MS") {
            config.batch_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>("TABSENSE_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("TABSENSE_CLASSIFY_TIMEOUT_MS") {
            config.classify_timeout = if ms == 0 {
                None
            } else {
                Some(Duration::from_millis(ms))
            };
        }
        if let Some(ratio) = env_parse::<f32>("TABSENSE_PASS2_MIN_RATIO") {
            config.pass2_min_uncertain_ratio = ratio;
        }
        if let Ok(version) = std::env::var("TABSENSE_MODEL_VERSION") {
            config.model_version = version;
        }

        config
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}

/// Score adjustments applied by the heuristic booster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    pub learned_dominant_weight: f32,
    pub learned_dominant_min_confidence: f32,
    pub learned_alternative_weight: f32,
    pub learned_alternative_min_confidence: f32,
    pub temporal_pattern_weight: f32,
    pub temporal_pattern_min_share: f32,
    pub domain_content_type: f32,
    pub domain_intent: f32,
    /// Tabs idle longer than this count as stale
    pub stale_after: Duration,
    pub stale_boost: f32,
    pub fallback_communication: f32,
    pub fallback_search: f32,
    pub fallback_search_intent: f32,
    pub inactive_maybe: f32,
    pub inactive_todo_penalty: f32,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            learned_dominant_weight: 0.3,
            learned_dominant_min_confidence: 0.5,
            learned_alternative_weight: 0.15,
            learned_alternative_min_confidence: 0.3,
            temporal_pattern_weight: 0.15,
            temporal_pattern_min_share: 0.1,
            domain_content_type: 0.2,
            domain_intent: 0.15,
            stale_after: DAY * 7,
            stale_boost: 0.1,
            fallback_communication: 0.15,
            fallback_search: 0.15,
            fallback_search_intent: 0.1,
            inactive_maybe: 0.1,
            inactive_todo_penalty: 0.1,
        }
    }
}

/// Thresholds used when learning patterns from Pass 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Every dimension's top score must exceed this for a tab to vote
    pub vote_threshold: f32,
    /// Tabs whose mean top score falls below this are uncertain
    pub uncertainty_threshold: f32,
    pub max_alternatives: usize,
    pub age_buckets: AgeBuckets,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            vote_threshold: 0.4,
            uncertainty_threshold: 0.5,
            max_alternatives: 2,
            age_buckets: AgeBuckets::default(),
        }
    }
}

/// Upper bounds of the recent / active / stale buckets; anything older is old
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeBuckets {
    pub recent: Duration,
    pub active: Duration,
    pub stale: Duration,
}

impl Default for AgeBuckets {
    fn default() -> Self {
        Self {
            recent: DAY * 7,
            active: DAY * 30,
            stale: DAY * 180,
        }
    }
}

impl AgeBuckets {
    pub fn bucket_for(&self, age: Duration) -> AgeBucket {
        if age < self.recent {
            AgeBucket::Recent
        } else if age < self.active {
            AgeBucket::Active
        } else if age < self.stale {
            AgeBucket::Stale
        } else {
            AgeBucket::Old
        }
    }
}
