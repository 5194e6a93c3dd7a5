//! Error taxonomy for the classification engine
//!
//! Only `ModelLoad` and `Cancelled` ever reach the caller of a run. Per-tab
//! failures (`Classification`, `Timeout`) are absorbed by the orchestrator,
//! which substitutes the default classification and keeps going.

use crate::types::Dimension;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    /// The zero-shot model could not be initialized; the handle has reset
    #[error("model load failed: {message}")]
    ModelLoad { message: String },

    #[error("classification failed for {dimension}: {message}")]
    Classification { dimension: Dimension, message: String },

    #[error("classification for {dimension} timed out after {after_ms}ms")]
    Timeout { dimension: Dimension, after_ms: u64 },

    #[error("run cancelled after {completed_batches} batches")]
    Cancelled { completed_batches: usize },
}

impl ClassifyError {
    /// Whether the orchestrator recovers from this error by falling back
    /// to the default classification for the affected tab
    pub fn is_tab_local(&self) -> bool {
        matches!(self, Self::Classification { .. } | Self::Timeout { .. })
    }
}

pub type ClassifyResult<T> = std::result::Result<T, ClassifyError>;
