//! Two-pass orchestration of tab classification

use crate::booster::{BoostContext, HeuristicBooster};
use crate::cache::{classification_key, is_fresh, CacheStore, MemoryCache};
use crate::classifier::ClassifierHandle;
use crate::config::EngineConfig;
use crate::context::build_session_context;
use crate::error::{ClassifyError, ClassifyResult};
use crate::fallback::{default_classification, is_default};
use crate::features;
use crate::patterns::PatternLearner;
use crate::types::*;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs Pass 1 over all tabs, learns from it, and refines the uncertain
/// tabs in Pass 2 (thread-safe via Arc)
pub struct TwoPassOrchestrator {
    classifier: Arc<ClassifierHandle>,
    cache: Arc<dyn CacheStore<ClassificationResult>>,
    booster: HeuristicBooster,
    learner: PatternLearner,
    config: EngineConfig,
}

pub type SharedOrchestrator = Arc<TwoPassOrchestrator>;

impl TwoPassOrchestrator {
    pub fn new(
        classifier: Arc<ClassifierHandle>,
        cache: Arc<dyn CacheStore<ClassificationResult>>,
        config: EngineConfig,
    ) -> SharedOrchestrator {
        let booster = HeuristicBooster::new(config.boost.clone(), config.learning.age_buckets.clone());
        let learner = PatternLearner::new(config.learning.clone());
        Arc::new(Self {
            classifier,
            cache,
            booster,
            learner,
            config,
        })
    }

    /// Orchestrator backed by a process-local cache
    pub fn with_memory_cache(classifier: Arc<ClassifierHandle>, config: EngineConfig) -> SharedOrchestrator {
        Self::new(classifier, Arc::new(MemoryCache::<ClassificationResult>::new()), config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classify `tabs`; results come back index-aligned with the input
    pub async fn run(&self, tabs: &[TabRecord], options: RunOptions) -> ClassifyResult<RunOutcome> {
        self.run_with_cancel(tabs, options, &CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), checking `cancel` before every batch
    pub async fn run_with_cancel(
        &self,
        tabs: &[TabRecord],
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> ClassifyResult<RunOutcome> {
        let start = Instant::now();
        let now = EpochMillis::now();
        let batch_size = self.config.batch_size.max(1);
        let session = build_session_context(
            tabs,
            now,
            &self.config.learning.age_buckets,
            self.config.boost.stale_after,
        );

        // Step 0: reuse fresh cache entries
        let mut slots: Vec<Option<ClassificationResult>> = Vec::with_capacity(tabs.len());
        let mut pending: Vec<usize> = Vec::new();
        // cache hits already refined by an earlier run's Pass 2
        let mut previously_refined: HashSet<usize> = HashSet::new();
        for (idx, tab) in tabs.iter().enumerate() {
            let cached = self.fresh_cached(tab, now).await.map(|mut hit| {
                if hit.metadata.refined_in_pass2 {
                    previously_refined.insert(idx);
                }
                hit.metadata.refined_in_pass2 = false;
                hit.metadata.confidence_improvement = None;
                hit
            });
            if cached.is_none() {
                pending.push(idx);
            }
            slots.push(cached);
        }
        let cache_hits = tabs.len() - pending.len();

        info!(
            "Classifying {} tabs: {} cached, {} pending, batch size {}",
            tabs.len(),
            cache_hits,
            pending.len(),
            batch_size
        );

        // Step 1: Pass 1 over everything not served from cache
        let pass1_start = Instant::now();
        if !pending.is_empty() {
            self.classifier.model().await?;
        }
        let pass1_ctx = BoostContext {
            session: &session,
            learned: None,
        };
        let mut completed_batches = 0;
        for batch in pending.chunks(batch_size) {
            self.batch_boundary(cancel, completed_batches).await?;

            let outcomes = join_all(batch.iter().map(|&idx| self.classify_tab(&tabs[idx], &pass1_ctx))).await;
            for (&idx, outcome) in batch.iter().zip(outcomes) {
                let result = outcome?;
                if !is_default(&result) {
                    self.store(&result).await;
                }
                slots[idx] = Some(result);
            }

            completed_batches += 1;
            debug!("Pass 1 batch {} done ({} tabs)", completed_batches, batch.len());
        }
        let pass1_time = pass1_start.elapsed().as_millis() as u64;

        let mut results: Vec<ClassificationResult> = slots
            .into_iter()
            .zip(tabs)
            .map(|(slot, tab)| slot.unwrap_or_else(|| default_classification(&tab.id)))
            .collect();

        info!("Pass 1 complete: {} tabs classified in {}ms", pending.len(), pass1_time);

        // Step 2: learn from every Pass 1 result, cache hits included
        let patterns = self.learner.extract_patterns(&results, tabs, now);

        // Step 3: decide on Pass 2
        if !self.should_run_pass2(&patterns, options.force_pass2) {
            info!(
                "Skipping Pass 2: {} of {} tabs uncertain",
                patterns.stats.uncertain_count, patterns.stats.total_tabs
            );
            let stats = RunStats {
                total_tabs: tabs.len(),
                cache_hits,
                pass1_time,
                pass2_time: 0,
                uncertain_refined: 0,
                average_improvement: 0.0,
                total_time: start.elapsed().as_millis() as u64,
            };
            return Ok(RunOutcome {
                results,
                patterns,
                stats,
            });
        }

        let to_refine: Vec<&UncertainTab> = patterns
            .uncertain_tabs
            .iter()
            .filter(|uncertain| !previously_refined.contains(&uncertain.tab_index))
            .collect();

        info!(
            "Running Pass 2 on {} uncertain tabs ({} already refined, forced: {})",
            to_refine.len(),
            patterns.uncertain_tabs.len() - to_refine.len(),
            options.force_pass2
        );

        // Step 4: Pass 2 with learned patterns
        let pass2_start = Instant::now();
        let pass2_ctx = BoostContext {
            session: &session,
            learned: Some(&patterns),
        };
        let mut improvements: Vec<f32> = Vec::with_capacity(to_refine.len());
        for batch in to_refine.chunks(batch_size) {
            self.batch_boundary(cancel, completed_batches).await?;

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|uncertain| self.classify_tab(&tabs[uncertain.tab_index], &pass2_ctx)),
            )
            .await;
            for (uncertain, outcome) in batch.iter().zip(outcomes) {
                let mut refined = outcome?;
                let improvement = refined.avg_top_score() - uncertain.avg_confidence;
                refined.metadata.refined_in_pass2 = true;
                refined.metadata.confidence_improvement = Some(improvement);
                if !is_default(&refined) {
                    self.store(&refined).await;
                }
                improvements.push(improvement);
                results[uncertain.tab_index] = refined;
            }

            completed_batches += 1;
            debug!("Pass 2 batch {} done ({} tabs)", completed_batches, batch.len());
        }
        let pass2_time = pass2_start.elapsed().as_millis() as u64;

        let average_improvement = if improvements.is_empty() {
            0.0
        } else {
            improvements.iter().sum::<f32>() / improvements.len() as f32
        };

        let stats = RunStats {
            total_tabs: tabs.len(),
            cache_hits,
            pass1_time,
            pass2_time,
            uncertain_refined: improvements.len(),
            average_improvement,
            total_time: start.elapsed().as_millis() as u64,
        };

        info!(
            "Classification complete: {} refined (avg improvement {:.3}) in {}ms",
            stats.uncertain_refined, stats.average_improvement, stats.total_time
        );

        Ok(RunOutcome {
            results,
            patterns,
            stats,
        })
    }

    /// Pass 2 runs when forced, or when the uncertain share of all tabs
    /// (cache hits included) reaches the configured ratio
    fn should_run_pass2(&self, patterns: &LearnedPatterns, force: bool) -> bool {
        if force {
            return true;
        }
        let uncertain = patterns.stats.uncertain_count;
        let total = patterns.stats.total_tabs;
        if uncertain == 0 || total == 0 {
            return false;
        }
        uncertain as f32 / total as f32 >= self.config.pass2_min_uncertain_ratio
    }

    /// Full pipeline for one tab: features, classifier, booster.
    /// Only a model load failure escapes; anything tab-local becomes the
    /// default classification.
    async fn classify_tab(&self, tab: &TabRecord, ctx: &BoostContext<'_>) -> ClassifyResult<ClassificationResult> {
        let text = match features::extract(tab) {
            Some(text) if features::is_sufficient(&text, self.config.min_feature_chars) => text,
            _ => {
                debug!("Tab {} has too little text, using default classification", tab.id);
                return Ok(default_classification(&tab.id));
            }
        };

        let raw = match self.classifier.classify_text(&text, self.config.classify_timeout).await {
            Ok(raw) => raw,
            Err(e) if e.is_tab_local() => {
                warn!("Classification failed for tab {}: {}. Using default.", tab.id, e);
                return Ok(default_classification(&tab.id));
            }
            Err(e) => return Err(e),
        };

        let classifications = self.booster.boost(&raw, ctx, tab);

        Ok(ClassificationResult {
            tab_id: tab.id.clone(),
            classifications,
            metadata: ClassificationMetadata {
                model_version: self.config.model_version.clone(),
                classified_at: EpochMillis::now(),
                session_context_summary: Some(ctx.session.summary()),
                refined_in_pass2: false,
                confidence_improvement: None,
            },
        })
    }

    /// Pause between batches, then honor cancellation
    async fn batch_boundary(&self, cancel: &CancellationToken, completed_batches: usize) -> ClassifyResult<()> {
        if completed_batches > 0 {
            let delay = self.config.batch_delay;
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
        if cancel.is_cancelled() {
            info!("Classification cancelled after {} batches", completed_batches);
            return Err(ClassifyError::Cancelled { completed_batches });
        }
        Ok(())
    }

    async fn fresh_cached(&self, tab: &TabRecord, now: EpochMillis) -> Option<ClassificationResult> {
        match self.cache.get(&classification_key(&tab.id)).await {
            Ok(Some(result)) if is_fresh(&result, now, self.config.cache_ttl) => Some(result),
            Ok(_) => None,
            Err(e) => {
                warn!("Cache read failed for tab {}: {:#}. Treating as miss.", tab.id, e);
                None
            }
        }
    }

    async fn store(&self, result: &ClassificationResult) {
        if let Err(e) = self
            .cache
            .set(&classification_key(&result.tab_id), result.clone())
            .await
        {
            warn!("Cache write failed for tab {}: {:#}", result.tab_id, e);
        }
    }
}
