//! Static classification used when a tab cannot be classified

use crate::types::{
    ClassificationMetadata, ClassificationResult, Dimension, DimensionScore, DimensionScores,
};

pub const DEFAULT_MODEL_VERSION: &str = "default";

// In label order: informational, navigational, transactional
const INTENT: [f32; 3] = [0.6, 0.25, 0.15];
// to-read, to-do, reference, maybe, done
const STATUS: [f32; 5] = [0.5, 0.2, 0.15, 0.1, 0.05];
// content, communication, search
const CONTENT_TYPE: [f32; 3] = [0.7, 0.2, 0.1];

/// Fixed result for tabs with too little text or a failing classifier.
///
/// Identical for every call with the same `tab_id`; `classified_at` is the
/// epoch so the entry is never mistaken for a fresh classification.
pub fn default_classification(tab_id: &str) -> ClassificationResult {
    let mut classifications = DimensionScores::new();
    classifications.insert(Dimension::Intent, DimensionScore::from_scores(Dimension::Intent, &INTENT));
    classifications.insert(Dimension::Status, DimensionScore::from_scores(Dimension::Status, &STATUS));
    classifications.insert(
        Dimension::ContentType,
        DimensionScore::from_scores(Dimension::ContentType, &CONTENT_TYPE),
    );

    ClassificationResult {
        tab_id: tab_id.to_string(),
        classifications,
        metadata: ClassificationMetadata {
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            classified_at: Default::default(),
            session_context_summary: None,
            refined_in_pass2: false,
            confidence_improvement: None,
        },
    }
}

pub fn is_default(result: &ClassificationResult) -> bool {
    result.metadata.model_version == DEFAULT_MODEL_VERSION
}
