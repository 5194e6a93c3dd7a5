//! tabsense - Two-pass tab classification engine
//!
//! Classifies browser tabs along three dimensions (intent, status, content
//! type) with a zero-shot model:
//! - Pass 1 classifies every tab, boosted by session heuristics
//! - Pattern learning over Pass 1 (domain mappings, temporal distributions)
//! - Pass 2 re-classifies only the uncertain tabs with learned patterns
//! - Fresh results are cached per tab; failures degrade to a default result

pub mod types;
pub mod error;
pub mod config;
pub mod features;
pub mod context;
pub mod classifier;
pub mod http_classifier; // zero-shot model behind an HTTP service
pub mod cache;
pub mod domain_knowledge;
pub mod booster;
pub mod patterns;
pub mod fallback;
pub mod orchestrator;
pub mod server;

pub use types::*;
pub use error::{ClassifyError, ClassifyResult};
pub use config::{AgeBuckets, BoostConfig, EngineConfig, LearningConfig};
pub use classifier::{ClassifierHandle, MockZeroShotModel, ModelLoader, ZeroShotModel};
pub use http_classifier::{HttpModelLoader, HttpZeroShotModel};
pub use cache::{CacheStore, JsonFileCache, MemoryCache};
pub use booster::{BoostContext, HeuristicBooster};
pub use patterns::PatternLearner;
pub use orchestrator::{SharedOrchestrator, TwoPassOrchestrator};

#[cfg(test)]
mod tests;
