//! Session context derived once per run from the full tab set

use crate::config::AgeBuckets;
use crate::types::{AgeBucket, EpochMillis, SessionContext, TabRecord, TemporalPattern};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Tabs idle longer than `stale_after` (the booster's decay threshold) count
/// as stale.
pub fn build_session_context(
    tabs: &[TabRecord],
    now: EpochMillis,
    buckets: &AgeBuckets,
    stale_after: Duration,
) -> SessionContext {
    let mut domain_clusters: HashMap<String, usize> = HashMap::new();
    for tab in tabs {
        let domain = tab.domain.trim();
        if !domain.is_empty() {
            *domain_clusters.entry(domain.to_string()).or_insert(0) += 1;
        }
    }
    let co_occurring_domains: BTreeSet<String> = domain_clusters.keys().cloned().collect();

    let ages: Vec<Duration> = tabs.iter().map(|t| t.age_at(now)).collect();
    let oldest = ages.iter().copied().max().unwrap_or_default();
    let newest = ages.iter().copied().min().unwrap_or_default();

    let temporal_pattern = TemporalPattern {
        all_recent: !ages.is_empty()
            && ages.iter().all(|&age| buckets.bucket_for(age) == AgeBucket::Recent),
        has_stale_tabs: ages.iter().any(|&age| age > stale_after),
        age_spread: oldest.saturating_sub(newest),
    };

    SessionContext {
        total_tabs: tabs.len(),
        co_occurring_domains,
        domain_clusters,
        session_age: oldest,
        temporal_pattern,
        reference_time: now,
    }
}

impl SessionContext {
    /// One-line description carried on every freshly classified result
    pub fn summary(&self) -> String {
        let recency = if self.temporal_pattern.all_recent {
            "all recent"
        } else if self.temporal_pattern.has_stale_tabs {
            "stale tabs present"
        } else {
            "mixed recency"
        };
        format!(
            "{} tabs, {} domains, {}",
            self.total_tabs,
            self.co_occurring_domains.len(),
            recency
        )
    }

    /// How many tabs in this session share `domain`
    pub fn cluster_size(&self, domain: &str) -> usize {
        self.domain_clusters.get(domain).copied().unwrap_or(0)
    }
}
