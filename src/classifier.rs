//! Zero-shot classifier seam and the handle that loads it exactly once

use crate::error::{ClassifyError, ClassifyResult};
use crate::types::{Dimension, DimensionScore, DimensionScores, LabelScore};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{error, info};

/// External zero-shot sequence classifier
#[async_trait]
pub trait ZeroShotModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Score `text` against `labels`, best first
    async fn classify(
        &self,
        text: &str,
        labels: &[&str],
        multi_label: bool,
    ) -> Result<Vec<LabelScore>>;
}

/// Produces a ready model; may be slow and may fail
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn ZeroShotModel>>;
}

type LoadFuture = Shared<BoxFuture<'static, ClassifyResult<Arc<dyn ZeroShotModel>>>>;

enum LoadState {
    Unloaded,
    Loading(LoadFuture),
    Ready(Arc<dyn ZeroShotModel>),
}

/// Owns one-shot model initialization.
///
/// Concurrent first callers share a single in-flight load. If it fails, every
/// waiter gets the same `ModelLoad` error and the handle returns to unloaded,
/// so the next call starts a fresh attempt.
pub struct ClassifierHandle {
    loader: Arc<dyn ModelLoader>,
    state: Mutex<LoadState>,
}

impl ClassifierHandle {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    /// Handle around a model that is already initialized
    pub fn from_model(model: Arc<dyn ZeroShotModel>) -> Self {
        Self {
            loader: Arc::new(Preloaded(model.clone())),
            state: Mutex::new(LoadState::Ready(model)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.lock_state(), LoadState::Ready(_))
    }

    /// The loaded model, initializing it on first use
    pub async fn model(&self) -> ClassifyResult<Arc<dyn ZeroShotModel>> {
        let load = {
            let mut state = self.lock_state();
            match &*state {
                LoadState::Ready(model) => return Ok(model.clone()),
                LoadState::Loading(load) => load.clone(),
                LoadState::Unloaded => {
                    let load = self.start_load();
                    *state = LoadState::Loading(load.clone());
                    load
                }
            }
        };

        let outcome = load.clone().await;

        let mut state = self.lock_state();
        if let LoadState::Loading(current) = &*state {
            if current.ptr_eq(&load) {
                *state = match &outcome {
                    Ok(model) => LoadState::Ready(model.clone()),
                    Err(_) => LoadState::Unloaded,
                };
            }
        }
        outcome
    }

    /// Classify `text` on every dimension concurrently. Any dimension failing
    /// fails the whole call, but only after all three have finished.
    pub async fn classify_text(
        &self,
        text: &str,
        timeout: Option<Duration>,
    ) -> ClassifyResult<DimensionScores> {
        let model = self.model().await?;
        let model = model.as_ref();

        let (intent, status, content_type) = futures::future::join3(
            classify_dimension(model, text, Dimension::Intent, timeout),
            classify_dimension(model, text, Dimension::Status, timeout),
            classify_dimension(model, text, Dimension::ContentType, timeout),
        )
        .await;

        let mut scores = DimensionScores::new();
        scores.insert(Dimension::Intent, intent?);
        scores.insert(Dimension::Status, status?);
        scores.insert(Dimension::ContentType, content_type?);
        Ok(scores)
    }

    fn start_load(&self) -> LoadFuture {
        let loader = self.loader.clone();
        info!("Loading zero-shot model");
        async move {
            match loader.load().await {
                Ok(model) => {
                    info!("Zero-shot model '{}' ready", model.name());
                    Ok(model)
                }
                Err(e) => {
                    error!("Zero-shot model failed to load: {:#}", e);
                    Err(ClassifyError::ModelLoad {
                        message: format!("{:#}", e),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock_state(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn classify_dimension(
    model: &dyn ZeroShotModel,
    text: &str,
    dimension: Dimension,
    timeout: Option<Duration>,
) -> ClassifyResult<DimensionScore> {
    let call = model.classify(text, dimension.labels(), true);
    let ranked = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| ClassifyError::Timeout {
                dimension,
                after_ms: limit.as_millis() as u64,
            })?,
        None => call.await,
    }
    .map_err(|e| ClassifyError::Classification {
        dimension,
        message: format!("{:#}", e),
    })?;

    Ok(DimensionScore::from_ranked(dimension, &ranked))
}

struct Preloaded(Arc<dyn ZeroShotModel>);

#[async_trait]
impl ModelLoader for Preloaded {
    async fn load(&self) -> Result<Arc<dyn ZeroShotModel>> {
        Ok(self.0.clone())
    }
}

/// Deterministic model for tests and demos.
///
/// Each dimension has a default distribution (in label order); rules keyed on
/// a substring of the input text override it or make the call fail.
pub struct MockZeroShotModel {
    defaults: HashMap<Dimension, Vec<f32>>,
    rules: Vec<MockRule>,
    failures: Vec<(String, Option<Dimension>)>,
    calls: AtomicUsize,
}

struct MockRule {
    needle: String,
    dimension: Dimension,
    scores: Vec<f32>,
}

impl MockZeroShotModel {
    pub fn new() -> Self {
        let mut defaults = HashMap::new();
        defaults.insert(Dimension::Intent, vec![0.6, 0.25, 0.15]);
        defaults.insert(Dimension::Status, vec![0.45, 0.2, 0.15, 0.12, 0.08]);
        defaults.insert(Dimension::ContentType, vec![0.7, 0.2, 0.1]);
        Self {
            defaults,
            rules: Vec::new(),
            failures: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_scores(mut self, dimension: Dimension, scores: &[f32]) -> Self {
        self.defaults.insert(dimension, scores.to_vec());
        self
    }

    /// Use `scores` for `dimension` whenever the text contains `needle`
    pub fn with_text_scores(mut self, needle: &str, dimension: Dimension, scores: &[f32]) -> Self {
        self.rules.push(MockRule {
            needle: needle.to_string(),
            dimension,
            scores: scores.to_vec(),
        });
        self
    }

    /// Fail every dimension whenever the text contains `needle`
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failures.push((needle.to_string(), None));
        self
    }

    /// Fail only `dimension` whenever the text contains `needle`
    pub fn failing_dimension_on(mut self, needle: &str, dimension: Dimension) -> Self {
        self.failures.push((needle.to_string(), Some(dimension)));
        self
    }

    /// Number of `classify` calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn dimension_for(labels: &[&str]) -> Option<Dimension> {
        Dimension::ALL.into_iter().find(|d| d.labels() == labels)
    }
}

impl Default for MockZeroShotModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ZeroShotModel for MockZeroShotModel {
    fn name(&self) -> &'static str {
        "mock_zero_shot"
    }

    async fn classify(
        &self,
        text: &str,
        labels: &[&str],
        _multi_label: bool,
    ) -> Result<Vec<LabelScore>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let dimension = Self::dimension_for(labels)
            .ok_or_else(|| anyhow::anyhow!("unknown label set: {:?}", labels))?;

        for (needle, only) in &self.failures {
            if text.contains(needle.as_str()) && only.map_or(true, |d| d == dimension) {
                anyhow::bail!("mock failure for '{}'", needle);
            }
        }

        let scores = self
            .rules
            .iter()
            .rev()
            .find(|r| r.dimension == dimension && text.contains(r.needle.as_str()))
            .map(|r| &r.scores)
            .or_else(|| self.defaults.get(&dimension))
            .cloned()
            .unwrap_or_default();

        let mut ranked: Vec<LabelScore> = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| LabelScore::new(*label, scores.get(idx).copied().unwrap_or(0.0)))
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }
}
