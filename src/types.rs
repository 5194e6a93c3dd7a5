//! Core type definitions for tab classification

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::time::{Duration, SystemTime};

/// Label names, shared by every component that boosts, learns or parses labels.
pub mod label {
    pub const INFORMATIONAL: &str = "informational";
    pub const NAVIGATIONAL: &str = "navigational";
    pub const TRANSACTIONAL: &str = "transactional";

    pub const TO_READ: &str = "to-read";
    pub const TO_DO: &str = "to-do";
    pub const REFERENCE: &str = "reference";
    pub const MAYBE: &str = "maybe";
    pub const DONE: &str = "done";

    pub const CONTENT: &str = "content";
    pub const COMMUNICATION: &str = "communication";
    pub const SEARCH: &str = "search";
}

const INTENT_LABELS: [&str; 3] = [label::INFORMATIONAL, label::NAVIGATIONAL, label::TRANSACTIONAL];
const STATUS_LABELS: [&str; 5] = [
    label::TO_READ,
    label::TO_DO,
    label::REFERENCE,
    label::MAYBE,
    label::DONE,
];
const CONTENT_TYPE_LABELS: [&str; 3] = [label::CONTENT, label::COMMUNICATION, label::SEARCH];

/// Only labels scoring above this make it into `top_k`
pub const TOP_K_THRESHOLD: f32 = 0.3;
/// Maximum length of `top_k`
pub const TOP_K_LIMIT: usize = 3;

/// One of the three independent classification axes
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Intent,
    Status,
    ContentType,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Intent, Dimension::Status, Dimension::ContentType];

    /// Ordered label set for this dimension
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Intent => &INTENT_LABELS,
            Self::Status => &STATUS_LABELS,
            Self::ContentType => &CONTENT_TYPE_LABELS,
        }
    }

    pub fn has_label(self, label: &str) -> bool {
        self.labels().contains(&label)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Status => "status",
            Self::ContentType => "contentType",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milliseconds since the Unix epoch.
///
/// Timestamps are normalized into this type once, at the ingestion boundary,
/// so nothing downstream has to guess units again.
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpochMillis(pub i64);

impl EpochMillis {
    /// Raw values below this are epoch seconds, not milliseconds
    pub const SECONDS_CUTOFF: i64 = 10_000_000_000;

    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(millis as i64)
    }

    /// Normalize a timestamp from a source that mixes seconds and milliseconds
    pub fn from_ambiguous(raw: i64) -> Self {
        if raw < Self::SECONDS_CUTOFF {
            Self(raw.saturating_mul(1000))
        } else {
            Self(raw)
        }
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Time elapsed from `self` until `later`; zero when `later` is earlier
    pub fn elapsed_until(self, later: EpochMillis) -> Duration {
        let millis = later.0.saturating_sub(self.0).max(0);
        Duration::from_millis(millis as u64)
    }

    pub fn saturating_sub(self, d: Duration) -> Self {
        Self(self.0.saturating_sub(d.as_millis() as i64))
    }

    pub fn saturating_add(self, d: Duration) -> Self {
        Self(self.0.saturating_add(d.as_millis() as i64))
    }
}

/// Browser tab snapshot supplied by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub last_active_at: EpochMillis,
    #[serde(default)]
    pub inactive: bool,
}

impl TabRecord {
    pub fn age_at(&self, now: EpochMillis) -> Duration {
        self.last_active_at.elapsed_until(now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self { label: label.into(), score }
    }
}

/// Scores for one dimension. `top_k` is derived from `scores` on every
/// mutation and never stored independently of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DimensionScoreRepr")]
pub struct DimensionScore {
    labels: Vec<String>,
    scores: Vec<f32>,
    top_k: Vec<LabelScore>,
}

/// Persisted shape; a stored `topK` is ignored and recomputed
#[derive(Deserialize)]
struct DimensionScoreRepr {
    labels: Vec<String>,
    scores: Vec<f32>,
}

impl TryFrom<DimensionScoreRepr> for DimensionScore {
    type Error = String;

    fn try_from(repr: DimensionScoreRepr) -> Result<Self, Self::Error> {
        if repr.labels.len() != repr.scores.len() {
            return Err(format!(
                "{} labels but {} scores",
                repr.labels.len(),
                repr.scores.len()
            ));
        }
        let scores = repr.scores.into_iter().map(clamp_unit).collect();
        Ok(Self::build(repr.labels, scores))
    }
}

impl DimensionScore {
    fn build(labels: Vec<String>, scores: Vec<f32>) -> Self {
        let mut ds = Self {
            labels,
            scores,
            top_k: Vec::new(),
        };
        ds.recompute_top_k();
        ds
    }

    /// Scores given in the dimension's label order. Missing entries are 0.0,
    /// extra entries are ignored.
    pub fn from_scores(dimension: Dimension, scores: &[f32]) -> Self {
        let labels: Vec<String> = dimension.labels().iter().map(|l| l.to_string()).collect();
        let scores = (0..labels.len())
            .map(|i| clamp_unit(scores.get(i).copied().unwrap_or(0.0)))
            .collect();
        Self::build(labels, scores)
    }

    /// Align a ranked classifier output with the dimension's label order.
    /// Labels the classifier did not return score 0.0; unknown labels are dropped.
    pub fn from_ranked(dimension: Dimension, ranked: &[LabelScore]) -> Self {
        let labels: Vec<String> = dimension.labels().iter().map(|l| l.to_string()).collect();
        let scores = labels
            .iter()
            .map(|label| {
                ranked
                    .iter()
                    .find(|ls| &ls.label == label)
                    .map(|ls| clamp_unit(ls.score))
                    .unwrap_or(0.0)
            })
            .collect();
        Self::build(labels, scores)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn top_k(&self) -> &[LabelScore] {
        &self.top_k
    }

    pub fn score_of(&self, label: &str) -> Option<f32> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|idx| self.scores[idx])
    }

    /// Highest-scoring label regardless of the `top_k` threshold (first wins ties)
    pub fn top(&self) -> Option<LabelScore> {
        let mut best: Option<(usize, f32)> = None;
        for (idx, &score) in self.scores.iter().enumerate() {
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((idx, score));
            }
        }
        best.map(|(idx, score)| LabelScore::new(self.labels[idx].clone(), score))
    }

    pub fn top_score(&self) -> f32 {
        self.top().map(|ls| ls.score).unwrap_or(0.0)
    }

    /// Add `amount` (may be negative) to `label`, clamped to [0, 1].
    /// Returns false, changing nothing, if the label is not in this dimension.
    pub fn boost_label(&mut self, label: &str, amount: f32) -> bool {
        let Some(idx) = self.labels.iter().position(|l| l == label) else {
            return false;
        };
        self.scores[idx] = clamp_unit(self.scores[idx] + amount);
        self.recompute_top_k();
        true
    }

    fn recompute_top_k(&mut self) {
        let mut ranked: Vec<LabelScore> = self
            .labels
            .iter()
            .zip(self.scores.iter())
            .filter(|(_, &score)| score > TOP_K_THRESHOLD)
            .map(|(label, &score)| LabelScore::new(label.clone(), score))
            .collect();
        // stable: equal scores keep label order
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(TOP_K_LIMIT);
        self.top_k = ranked;
    }
}

fn clamp_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

pub type DimensionScores = BTreeMap<Dimension, DimensionScore>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationMetadata {
    pub model_version: String,
    pub classified_at: EpochMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_context_summary: Option<String>,
    #[serde(default)]
    pub refined_in_pass2: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_improvement: Option<f32>,
}

/// Outcome of classifying one tab; replaced, never mutated, on refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub tab_id: String,
    pub classifications: DimensionScores,
    pub metadata: ClassificationMetadata,
}

impl ClassificationResult {
    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionScore> {
        self.classifications.get(&dimension)
    }

    pub fn top_label(&self, dimension: Dimension) -> Option<String> {
        self.dimension(dimension).and_then(|ds| ds.top()).map(|ls| ls.label)
    }

    pub fn top_score(&self, dimension: Dimension) -> f32 {
        self.dimension(dimension).map(|ds| ds.top_score()).unwrap_or(0.0)
    }

    /// Mean of the top score across all three dimensions
    pub fn avg_top_score(&self) -> f32 {
        let sum: f32 = Dimension::ALL.iter().map(|&d| self.top_score(d)).sum();
        sum / Dimension::ALL.len() as f32
    }
}

/// Recency profile of a session
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalPattern {
    pub all_recent: bool,
    /// Some tab is past the booster's `stale_after`
    pub has_stale_tabs: bool,
    pub age_spread: Duration,
}

/// Facts derived once per run from the whole tab set
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub total_tabs: usize,
    pub co_occurring_domains: BTreeSet<String>,
    pub domain_clusters: HashMap<String, usize>,
    pub session_age: Duration,
    pub temporal_pattern: TemporalPattern,
    /// Clock reading every age in this run is measured against
    pub reference_time: EpochMillis,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBucket {
    Recent,
    Active,
    Stale,
    Old,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfidence {
    pub label: String,
    pub confidence: f32,
}

/// What the corpus says about one dimension on one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDimensionPattern {
    pub dominant: String,
    pub confidence: f32,
    pub alternatives: Vec<LabelConfidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncertainTab {
    pub tab_index: usize,
    pub tab_id: String,
    pub avg_confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternStats {
    pub total_tabs: usize,
    pub uncertain_count: usize,
    pub domains_classified: usize,
}

pub type LabelCounts = BTreeMap<String, usize>;

/// Corpus-level statistics learned from Pass 1, consumed by Pass 2
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedPatterns {
    pub domain_mappings: HashMap<String, BTreeMap<Dimension, DomainDimensionPattern>>,
    pub temporal_patterns: BTreeMap<AgeBucket, BTreeMap<Dimension, LabelCounts>>,
    pub global_distribution: BTreeMap<Dimension, LabelCounts>,
    pub uncertain_tabs: Vec<UncertainTab>,
    pub stats: PatternStats,
}

/// Options for one orchestration run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub force_pass2: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub total_tabs: usize,
    pub cache_hits: usize,
    pub pass1_time: u64,
    pub pass2_time: u64,
    pub uncertain_refined: usize,
    pub average_improvement: f32,
    pub total_time: u64,
}

/// Result set of an orchestration run, index-aligned with the input tabs
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub results: Vec<ClassificationResult>,
    pub patterns: LearnedPatterns,
    pub stats: RunStats,
}
