//! Heuristic score adjustments applied after the classifier

use crate::config::{AgeBuckets, BoostConfig};
use crate::domain_knowledge::{self, is_communication_domain, is_search_domain};
use crate::patterns::domain_key;
use crate::types::label::{
    COMMUNICATION, INFORMATIONAL, MAYBE, REFERENCE, SEARCH, TO_DO,
};
use crate::types::{Dimension, DimensionScores, LearnedPatterns, SessionContext, TabRecord};
use std::time::Duration;

/// Everything the booster may consult besides the tab itself
#[derive(Debug, Clone, Copy)]
pub struct BoostContext<'a> {
    pub session: &'a SessionContext,
    /// Present only during Pass 2
    pub learned: Option<&'a LearnedPatterns>,
}

pub struct HeuristicBooster {
    config: BoostConfig,
    age_buckets: AgeBuckets,
}

impl HeuristicBooster {
    pub fn new(config: BoostConfig, age_buckets: AgeBuckets) -> Self {
        Self { config, age_buckets }
    }

    /// Adjust a copy of `raw`; the input is left untouched.
    ///
    /// Adjustments run in a fixed order and compose: learned patterns,
    /// domain knowledge, temporal decay, fallback domain heuristics,
    /// inactivity.
    pub fn boost(&self, raw: &DimensionScores, ctx: &BoostContext<'_>, tab: &TabRecord) -> DimensionScores {
        let cfg = &self.config;
        let mut boosted = raw.clone();
        let age = tab.age_at(ctx.session.reference_time);

        if let Some(learned) = ctx.learned {
            self.apply_learned(&mut boosted, learned, tab, age);
        }

        let hint = domain_knowledge::lookup(&tab.domain);
        if let Some(hint) = hint {
            bump(&mut boosted, Dimension::ContentType, hint.content_type, cfg.domain_content_type);
            bump(&mut boosted, Dimension::Intent, hint.common_intent, cfg.domain_intent);
        }

        if age > cfg.stale_after {
            bump(&mut boosted, Dimension::Status, REFERENCE, cfg.stale_boost);
            bump(&mut boosted, Dimension::Status, MAYBE, cfg.stale_boost);
        }

        if hint.is_none() {
            if is_communication_domain(&tab.domain) {
                bump(&mut boosted, Dimension::ContentType, COMMUNICATION, cfg.fallback_communication);
            } else if is_search_domain(&tab.domain) {
                bump(&mut boosted, Dimension::ContentType, SEARCH, cfg.fallback_search);
                bump(&mut boosted, Dimension::Intent, INFORMATIONAL, cfg.fallback_search_intent);
            }
        }

        if tab.inactive {
            bump(&mut boosted, Dimension::Status, MAYBE, cfg.inactive_maybe);
            bump(&mut boosted, Dimension::Status, TO_DO, -cfg.inactive_todo_penalty);
        }

        boosted
    }

    fn apply_learned(
        &self,
        boosted: &mut DimensionScores,
        learned: &LearnedPatterns,
        tab: &TabRecord,
        age: Duration,
    ) {
        let cfg = &self.config;

        if let Some(mappings) = domain_key(tab).and_then(|d| learned.domain_mappings.get(d)) {
            for (&dimension, pattern) in mappings {
                if pattern.confidence <= cfg.learned_dominant_min_confidence {
                    continue;
                }
                bump(
                    boosted,
                    dimension,
                    &pattern.dominant,
                    pattern.confidence * cfg.learned_dominant_weight,
                );
                for alt in &pattern.alternatives {
                    if alt.confidence > cfg.learned_alternative_min_confidence {
                        bump(
                            boosted,
                            dimension,
                            &alt.label,
                            alt.confidence * cfg.learned_alternative_weight,
                        );
                    }
                }
            }
        }

        let bucket = self.age_buckets.bucket_for(age);
        let Some(per_dimension) = learned.temporal_patterns.get(&bucket) else {
            return;
        };
        for (&dimension, counts) in per_dimension {
            let total: usize = counts.values().sum();
            // ties go to the alphabetically first label
            let Some((label, &count)) = counts
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            else {
                continue;
            };
            if total == 0 {
                continue;
            }
            let share = count as f32 / total as f32;
            if share > cfg.temporal_pattern_min_share {
                bump(boosted, dimension, label, share * cfg.temporal_pattern_weight);
            }
        }
    }
}

fn bump(scores: &mut DimensionScores, dimension: Dimension, label: &str, amount: f32) {
    if let Some(ds) = scores.get_mut(&dimension) {
        ds.boost_label(label, amount);
    }
}
