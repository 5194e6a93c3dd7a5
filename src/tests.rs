//! End-to-end tests for TwoPassOrchestrator

use crate::fallback::is_default;
use crate::label::{COMMUNICATION, REFERENCE, TO_READ};
use crate::*;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Helper to create a tab last active `age_days` ago
fn mock_tab(id: &str, title: &str, domain: &str, age_days: i64) -> TabRecord {
    TabRecord {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://{}/{}", domain, id),
        domain: domain.to_string(),
        last_active_at: EpochMillis(EpochMillis::now().0 - age_days * DAY_MS),
        inactive: false,
    }
}

fn test_config() -> EngineConfig {
    EngineConfig {
        batch_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn orchestrator_with(mock: &Arc<MockZeroShotModel>, cache: Arc<dyn CacheStore<ClassificationResult>>) -> SharedOrchestrator {
    let handle = ClassifierHandle::from_model(mock.clone());
    TwoPassOrchestrator::new(Arc::new(handle), cache, test_config())
}

/// `count` confident tabs on distinct unknown domains
fn article_tabs(count: usize) -> Vec<TabRecord> {
    (0..count)
        .map(|i| mock_tab(&format!("t{}", i), &format!("Article {}", i), &format!("site{}.example", i), 1))
        .collect()
}

/// Mock where any text containing "Murky" scores low on every dimension
fn murky_mock() -> MockZeroShotModel {
    MockZeroShotModel::new()
        .with_text_scores("Murky", Dimension::Intent, &[0.34, 0.33, 0.33])
        .with_text_scores("Murky", Dimension::Status, &[0.25, 0.2, 0.2, 0.2, 0.15])
        .with_text_scores("Murky", Dimension::ContentType, &[0.4, 0.3, 0.3])
}

struct FailingLoader;

#[async_trait]
impl ModelLoader for FailingLoader {
    async fn load(&self) -> Result<Arc<dyn ZeroShotModel>> {
        anyhow::bail!("weights not found")
    }
}

/// Delegates to the mock and cancels `token` after the first call
struct CancellingModel {
    inner: MockZeroShotModel,
    token: CancellationToken,
}

#[async_trait]
impl ZeroShotModel for CancellingModel {
    fn name(&self) -> &'static str {
        "cancelling"
    }

    async fn classify(&self, text: &str, labels: &[&str], multi_label: bool) -> Result<Vec<LabelScore>> {
        let ranked = self.inner.classify(text, labels, multi_label).await;
        self.token.cancel();
        ranked
    }
}

#[tokio::test]
async fn test_pass2_runs_at_five_percent_uncertain() {
    let mock = Arc::new(murky_mock());
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let mut tabs = article_tabs(19);
    tabs.push(mock_tab("murky", "Murky notes", "murky.example", 1));

    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    assert_eq!(outcome.results.len(), 20);
    assert_eq!(outcome.patterns.stats.uncertain_count, 1);
    assert_eq!(outcome.stats.uncertain_refined, 1);

    let refined = &outcome.results[19];
    assert_eq!(refined.tab_id, "murky");
    assert!(refined.metadata.refined_in_pass2);
    // every tab is recent and tops informational/to-read/content, so the
    // temporal pattern adds 0.15 to each of the refined tab's top labels
    let improvement = refined.metadata.confidence_improvement.unwrap();
    assert!((improvement - 0.15).abs() < 1e-4, "improvement {}", improvement);
    assert!((outcome.stats.average_improvement - improvement).abs() < 1e-6);

    // untouched tabs keep their Pass 1 result
    assert!(!outcome.results[0].metadata.refined_in_pass2);
    assert_eq!(outcome.results[0].tab_id, "t0");
}

#[tokio::test]
async fn test_refined_cache_hit_is_not_refined_again() {
    let mock = Arc::new(murky_mock());
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let mut tabs = article_tabs(19);
    tabs.push(mock_tab("murky", "Murky notes", "murky.example", 1));

    let first = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();
    assert_eq!(first.stats.uncertain_refined, 1);
    let calls = mock.call_count();

    // the refined tab is still below the uncertainty threshold
    let second = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();
    assert_eq!(second.stats.cache_hits, 20);
    assert_eq!(second.patterns.stats.uncertain_count, 1);
    assert_eq!(second.stats.uncertain_refined, 0);
    assert_eq!(second.stats.average_improvement, 0.0);
    assert_eq!(mock.call_count(), calls);

    let served = &second.results[19];
    assert!(!served.metadata.refined_in_pass2);
    assert_eq!(served.metadata.confidence_improvement, None);
    assert_eq!(served.classifications, first.results[19].classifications);
}

#[tokio::test]
async fn test_pass2_skipped_below_threshold() {
    let mock = Arc::new(murky_mock());
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    // 1 of 21 is under 5%
    let mut tabs = article_tabs(20);
    tabs.push(mock_tab("murky", "Murky notes", "murky.example", 1));

    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    assert_eq!(outcome.patterns.stats.uncertain_count, 1);
    assert_eq!(outcome.stats.pass2_time, 0);
    assert_eq!(outcome.stats.uncertain_refined, 0);
    assert!(!outcome.results[20].metadata.refined_in_pass2);
}

#[tokio::test]
async fn test_pass2_skipped_without_uncertain_tabs() {
    let mock = Arc::new(MockZeroShotModel::new());
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let tabs = article_tabs(5);
    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    assert_eq!(outcome.stats.total_tabs, 5);
    assert_eq!(outcome.stats.pass2_time, 0);
    assert_eq!(outcome.stats.uncertain_refined, 0);
    assert_eq!(outcome.stats.average_improvement, 0.0);
    assert!(outcome.results.iter().all(|r| !r.metadata.refined_in_pass2));
    // one call per dimension per tab
    assert_eq!(mock.call_count(), 15);
}

#[tokio::test]
async fn test_forced_pass2_refines_even_when_rare() {
    let mock = Arc::new(murky_mock());
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let mut tabs = article_tabs(20);
    tabs.push(mock_tab("murky", "Murky notes", "murky.example", 1));

    let outcome = orchestrator
        .run(&tabs, RunOptions { force_pass2: true })
        .await
        .unwrap();

    assert_eq!(outcome.stats.uncertain_refined, 1);
    assert!(outcome.results[20].metadata.refined_in_pass2);
}

#[tokio::test]
async fn test_results_are_index_aligned_across_batches() {
    let mock = Arc::new(MockZeroShotModel::new());
    let handle = ClassifierHandle::from_model(mock.clone());
    let config = EngineConfig {
        batch_size: 3,
        ..test_config()
    };
    let orchestrator = TwoPassOrchestrator::with_memory_cache(Arc::new(handle), config);

    let tabs = article_tabs(10);
    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    let ids: Vec<&str> = outcome.results.iter().map(|r| r.tab_id.as_str()).collect();
    let expected: Vec<&str> = tabs.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_fresh_cache_hits_skip_classification() {
    let mock = Arc::new(MockZeroShotModel::new());
    let cache = Arc::new(MemoryCache::<ClassificationResult>::new());
    let orchestrator = orchestrator_with(&mock, cache.clone());

    let tabs = article_tabs(3);
    let first = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();
    assert_eq!(first.stats.cache_hits, 0);
    assert_eq!(mock.call_count(), 9);
    assert_eq!(cache.len().await, 3);

    let second = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();
    assert_eq!(second.stats.cache_hits, 3);
    assert_eq!(mock.call_count(), 9);
    assert_eq!(second.results, first.results);
}

#[tokio::test]
async fn test_stale_cache_entry_is_reclassified() {
    let mock = Arc::new(MockZeroShotModel::new());
    let cache = Arc::new(MemoryCache::<ClassificationResult>::new());

    let tabs = article_tabs(2);
    let now = EpochMillis::now();

    let mut fresh = crate::fallback::default_classification("t0");
    fresh.metadata.model_version = "cached".to_string();
    fresh.metadata.classified_at = now.saturating_sub(Duration::from_secs(60 * 60));
    cache.set(&crate::cache::classification_key("t0"), fresh).await.unwrap();

    let mut stale = crate::fallback::default_classification("t1");
    stale.metadata.model_version = "cached".to_string();
    stale.metadata.classified_at = now.saturating_sub(Duration::from_secs(25 * 60 * 60));
    cache.set(&crate::cache::classification_key("t1"), stale).await.unwrap();

    let orchestrator = orchestrator_with(&mock, cache.clone());
    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    assert_eq!(outcome.stats.cache_hits, 1);
    assert_eq!(outcome.results[0].metadata.model_version, "cached");
    assert_eq!(outcome.results[1].metadata.model_version, "zero-shot-mnli");
    assert_eq!(mock.call_count(), 3);

    // the refreshed entry replaced the stale one
    let stored = cache
        .get(&crate::cache::classification_key("t1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.metadata.model_version, "zero-shot-mnli");
}

#[tokio::test]
async fn test_failing_tab_gets_default_and_run_continues() {
    let mock = Arc::new(MockZeroShotModel::new().failing_dimension_on("Broken", Dimension::Status));
    let cache = Arc::new(MemoryCache::<ClassificationResult>::new());
    let orchestrator = orchestrator_with(&mock, cache.clone());

    let mut tabs = article_tabs(2);
    tabs.insert(1, mock_tab("broken", "Broken page", "broken.example", 1));

    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert!(is_default(&outcome.results[1]));
    assert_eq!(outcome.results[1].tab_id, "broken");
    assert!(!is_default(&outcome.results[0]));
    assert!(!is_default(&outcome.results[2]));

    // defaults are not cached, so the next run retries the tab
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn test_insufficient_text_skips_classifier() {
    let mock = Arc::new(MockZeroShotModel::new());
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let tabs = vec![
        TabRecord {
            id: "blank".to_string(),
            title: "Untitled".to_string(),
            url: "about:blank".to_string(),
            domain: "about".to_string(),
            last_active_at: EpochMillis::now(),
            inactive: false,
        },
        TabRecord {
            id: "short".to_string(),
            title: "ab".to_string(),
            url: String::new(),
            domain: String::new(),
            last_active_at: EpochMillis::now(),
            inactive: false,
        },
    ];

    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    assert!(outcome.results.iter().all(is_default));
    assert_eq!(
        outcome.results[0],
        crate::fallback::default_classification("blank")
    );
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_model_load_failure_is_fatal() {
    let handle = ClassifierHandle::new(Arc::new(FailingLoader));
    let orchestrator = TwoPassOrchestrator::with_memory_cache(Arc::new(handle), test_config());

    let err = orchestrator
        .run(&article_tabs(2), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifyError::ModelLoad { .. }));
    assert!(err.to_string().contains("weights not found"));
}

#[tokio::test]
async fn test_empty_and_fully_cached_runs_never_load_model() {
    let handle = Arc::new(ClassifierHandle::new(Arc::new(FailingLoader)));
    let cache = Arc::new(MemoryCache::<ClassificationResult>::new());

    let tabs = article_tabs(1);
    let mut cached = crate::fallback::default_classification("t0");
    cached.metadata.model_version = "cached".to_string();
    cached.metadata.classified_at = EpochMillis::now();
    cache.set(&crate::cache::classification_key("t0"), cached).await.unwrap();

    let orchestrator = TwoPassOrchestrator::new(handle.clone(), cache, test_config());

    let empty = orchestrator.run(&[], RunOptions::default()).await.unwrap();
    assert!(empty.results.is_empty());
    assert_eq!(empty.stats.total_tabs, 0);

    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();
    assert_eq!(outcome.stats.cache_hits, 1);
    assert!(!handle.is_loaded());
}

#[tokio::test]
async fn test_cancelled_before_first_batch() {
    let mock = Arc::new(MockZeroShotModel::new());
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let token = CancellationToken::new();
    token.cancel();

    let err = orchestrator
        .run_with_cancel(&article_tabs(4), RunOptions::default(), &token)
        .await
        .unwrap_err();

    assert_eq!(err, ClassifyError::Cancelled { completed_batches: 0 });
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_cancellation_checked_between_batches() {
    let token = CancellationToken::new();
    let model = Arc::new(CancellingModel {
        inner: MockZeroShotModel::new(),
        token: token.clone(),
    });
    let handle = ClassifierHandle::from_model(model);
    let config = EngineConfig {
        batch_size: 2,
        batch_delay: Duration::from_millis(50),
        ..Default::default()
    };
    let orchestrator = TwoPassOrchestrator::with_memory_cache(Arc::new(handle), config);

    let err = orchestrator
        .run_with_cancel(&article_tabs(5), RunOptions::default(), &token)
        .await
        .unwrap_err();

    // the in-flight batch finishes; the next one never starts
    assert_eq!(err, ClassifyError::Cancelled { completed_batches: 1 });
}

#[tokio::test]
async fn test_gmail_end_to_end_is_communication() {
    let mock = Arc::new(
        MockZeroShotModel::new().with_text_scores("Gmail", Dimension::ContentType, &[0.5, 0.4, 0.1]),
    );
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let tabs = vec![mock_tab("gmail", "Gmail - Inbox", "mail.google.com", 0)];
    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    let result = &outcome.results[0];
    let content_type = result.dimension(Dimension::ContentType).unwrap();
    assert_eq!(content_type.top_k()[0].label, COMMUNICATION);
    assert!((content_type.top_k()[0].score - 0.6).abs() < 1e-5);
    assert!(result.metadata.session_context_summary.is_some());
}

#[tokio::test]
async fn test_stale_tab_boost_does_not_flip_winner() {
    let mock = Arc::new(MockZeroShotModel::new().with_text_scores(
        "Old essay",
        Dimension::Status,
        &[0.5, 0.05, 0.35, 0.05, 0.05],
    ));
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let tabs = vec![mock_tab("old", "Old essay", "blog.example", 10)];
    let outcome = orchestrator.run(&tabs, RunOptions::default()).await.unwrap();

    let status = outcome.results[0].dimension(Dimension::Status).unwrap();
    assert!((status.score_of(REFERENCE).unwrap() - 0.45).abs() < 1e-5);
    assert_eq!(status.top_k()[0].label, TO_READ);
    assert_eq!(status.top_k()[1].label, REFERENCE);
}

#[tokio::test]
async fn test_json_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("classifications.json");
    let tabs = article_tabs(2);

    let mock = Arc::new(MockZeroShotModel::new());
    let first = orchestrator_with(&mock, Arc::new(JsonFileCache::<ClassificationResult>::new(&path)));
    first.run(&tabs, RunOptions::default()).await.unwrap();
    assert_eq!(mock.call_count(), 6);

    let restarted = orchestrator_with(&mock, Arc::new(JsonFileCache::<ClassificationResult>::new(&path)));
    let outcome = restarted.run(&tabs, RunOptions::default()).await.unwrap();
    assert_eq!(outcome.stats.cache_hits, 2);
    assert_eq!(mock.call_count(), 6);
}

#[tokio::test]
async fn test_outcome_serializes_camel_case() {
    let mock = Arc::new(MockZeroShotModel::new());
    let orchestrator = orchestrator_with(&mock, Arc::new(MemoryCache::<ClassificationResult>::new()));

    let outcome = orchestrator.run(&article_tabs(1), RunOptions::default()).await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["stats"]["totalTabs"], 1);
    assert_eq!(json["stats"]["pass2Time"], 0);
    assert!(json["results"][0]["classifications"]["contentType"]["topK"].is_array());
}
