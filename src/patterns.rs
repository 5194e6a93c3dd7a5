//! Pattern learning over Pass 1 results

use crate::config::LearningConfig;
use crate::features::ABOUT_DOMAIN;
use crate::types::{
    ClassificationResult, Dimension, DomainDimensionPattern, EpochMillis, LabelConfidence,
    LabelScore, LearnedPatterns, PatternStats, TabRecord, UncertainTab,
};
use std::collections::{BTreeMap, HashMap};

/// Domain a tab contributes to domain mappings under, if any
pub fn domain_key(tab: &TabRecord) -> Option<&str> {
    let domain = tab.domain.trim();
    if domain.is_empty() || domain == ABOUT_DOMAIN {
        None
    } else {
        Some(domain)
    }
}

pub struct PatternLearner {
    config: LearningConfig,
}

impl PatternLearner {
    pub fn new(config: LearningConfig) -> Self {
        Self { config }
    }

    /// Aggregate `results` (index-aligned with `tabs`) into reusable patterns.
    /// Ages are measured against `now`.
    pub fn extract_patterns(
        &self,
        results: &[ClassificationResult],
        tabs: &[TabRecord],
        now: EpochMillis,
    ) -> LearnedPatterns {
        let cfg = &self.config;
        let mut patterns = LearnedPatterns::default();

        let mut votes: HashMap<&str, BTreeMap<Dimension, BTreeMap<&str, f32>>> = HashMap::new();
        let mut vote_counts: HashMap<&str, usize> = HashMap::new();

        for (tab_index, (result, tab)) in results.iter().zip(tabs).enumerate() {
            let tops: Vec<(Dimension, Option<LabelScore>)> = Dimension::ALL
                .iter()
                .map(|&d| (d, result.dimension(d).and_then(|ds| ds.top())))
                .collect();

            if let Some(domain) = domain_key(tab) {
                let confident = tops
                    .iter()
                    .all(|(_, top)| top.as_ref().map_or(false, |t| t.score > cfg.vote_threshold));
                if confident {
                    *vote_counts.entry(domain).or_insert(0) += 1;
                    let domain_votes = votes.entry(domain).or_default();
                    for (dimension, top) in &tops {
                        if let Some(top) = top {
                            let label = label_ref(*dimension, &top.label);
                            *domain_votes
                                .entry(*dimension)
                                .or_default()
                                .entry(label)
                                .or_insert(0.0) += top.score;
                        }
                    }
                }
            }

            let bucket = cfg.age_buckets.bucket_for(tab.age_at(now));
            let bucket_counts = patterns.temporal_patterns.entry(bucket).or_default();
            for (dimension, top) in &tops {
                if let Some(top) = top {
                    *bucket_counts
                        .entry(*dimension)
                        .or_default()
                        .entry(top.label.clone())
                        .or_insert(0) += 1;
                    *patterns
                        .global_distribution
                        .entry(*dimension)
                        .or_default()
                        .entry(top.label.clone())
                        .or_insert(0) += 1;
                }
            }

            let avg_confidence = result.avg_top_score();
            if avg_confidence < cfg.uncertainty_threshold {
                patterns.uncertain_tabs.push(UncertainTab {
                    tab_index,
                    tab_id: tab.id.clone(),
                    avg_confidence,
                });
            }
        }

        for (domain, per_dimension) in votes {
            let count = vote_counts.get(domain).copied().unwrap_or(1).max(1) as f32;
            let mut mapping = BTreeMap::new();
            for (dimension, label_votes) in per_dimension {
                let mut ranked: Vec<(&str, f32)> = label_votes.into_iter().collect();
                ranked.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.0.cmp(b.0))
                });
                let Some(&(dominant, vote)) = ranked.first() else {
                    continue;
                };
                let alternatives = ranked
                    .iter()
                    .skip(1)
                    .take(cfg.max_alternatives)
                    .map(|&(label, vote)| LabelConfidence {
                        label: label.to_string(),
                        confidence: vote / count,
                    })
                    .collect();
                mapping.insert(
                    dimension,
                    DomainDimensionPattern {
                        dominant: dominant.to_string(),
                        confidence: vote / count,
                        alternatives,
                    },
                );
            }
            patterns.domain_mappings.insert(domain.to_string(), mapping);
        }

        patterns.stats = PatternStats {
            total_tabs: tabs.len(),
            uncertain_count: patterns.uncertain_tabs.len(),
            domains_classified: patterns.domain_mappings.len(),
        };

        tracing::debug!(
            "Learned patterns: {} domains, {} uncertain of {} tabs",
            patterns.stats.domains_classified,
            patterns.stats.uncertain_count,
            patterns.stats.total_tabs
        );

        patterns
    }
}

/// Static label name for a label produced by this crate; labels are always
/// drawn from the dimension's label set.
fn label_ref(dimension: Dimension, label: &str) -> &'static str {
    dimension
        .labels()
        .iter()
        .copied()
        .find(|l| *l == label)
        .unwrap_or("unknown")
}
