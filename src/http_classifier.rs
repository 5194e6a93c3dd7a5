//! HTTP-backed zero-shot model that calls an inference service

use crate::classifier::{ModelLoader, ZeroShotModel};
use crate::types::LabelScore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to the inference service
#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    candidate_labels: &'a [&'a str],
    multi_label: bool,
}

/// Response from the inference service (zero-shot pipeline shape)
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
    #[serde(default)]
    inference_time_ms: Option<f64>,
}

impl ClassifyResponse {
    fn into_ranked(self) -> Result<Vec<LabelScore>> {
        if self.labels.len() != self.scores.len() {
            anyhow::bail!(
                "Inference service returned {} labels but {} scores",
                self.labels.len(),
                self.scores.len()
            );
        }
        let mut ranked: Vec<LabelScore> = self
            .labels
            .into_iter()
            .zip(self.scores)
            .map(|(label, score)| LabelScore::new(label, score as f32))
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }
}

/// Zero-shot model served over HTTP
pub struct HttpZeroShotModel {
    service_url: String,
    client: reqwest::Client,
}

impl HttpZeroShotModel {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ZeroShotModel for HttpZeroShotModel {
    fn name(&self) -> &'static str {
        "http_zero_shot"
    }

    async fn classify(
        &self,
        text: &str,
        labels: &[&str],
        multi_label: bool,
    ) -> Result<Vec<LabelScore>> {
        let request = ClassifyRequest {
            text,
            candidate_labels: labels,
            multi_label,
        };

        let url = format!("{}/classify", self.service_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to call inference service")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Inference service error ({}): {}", status, error_text);
        }

        let parsed: ClassifyResponse = response
            .json()
            .await
            .context("Failed to parse inference service response")?;

        if let Some(ms) = parsed.inference_time_ms {
            tracing::debug!("Zero-shot inference over {} labels in {:.1}ms", labels.len(), ms);
        }

        parsed.into_ranked()
    }
}

/// Loads the HTTP model once the service reports healthy
pub struct HttpModelLoader {
    service_url: String,
}

impl HttpModelLoader {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    async fn load(&self) -> Result<Arc<dyn ZeroShotModel>> {
        let url = format!("{}/health", self.service_url);
        let response = reqwest::Client::new()
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Inference service unreachable at {}", self.service_url))?;

        if !response.status().is_success() {
            anyhow::bail!("Inference service unhealthy ({})", response.status());
        }

        Ok(Arc::new(HttpZeroShotModel::new(self.service_url.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_is_ranked() {
        let response: ClassifyResponse = serde_json::from_str(
            r#"{"labels":["content","search","communication"],"scores":[0.2,0.7,0.1]}"#,
        )
        .unwrap();
        let ranked = response.into_ranked().unwrap();
        assert_eq!(ranked[0].label, "search");
        assert_eq!(ranked[2].label, "communication");
    }

    #[test]
    fn test_misaligned_response_is_rejected() {
        let response = ClassifyResponse {
            labels: vec!["content".to_string()],
            scores: vec![],
            inference_time_ms: None,
        };
        assert!(response.into_ranked().is_err());
    }

    #[test]
    fn test_request_shape() {
        let labels = ["to-read", "done"];
        let body = serde_json::to_value(ClassifyRequest {
            text: "hello",
            candidate_labels: &labels,
            multi_label: true,
        })
        .unwrap();
        assert_eq!(body["candidate_labels"][1], "done");
        assert_eq!(body["multi_label"], true);
    }

    #[tokio::test]
    #[ignore] // Requires running inference service
    async fn test_http_model_integration() {
        let loader = HttpModelLoader::new("http://127.0.0.1:8090");
        let model = loader.load().await.unwrap();
        let ranked = model
            .classify("Gmail - Inbox", &["content", "communication", "search"], true)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 3);
    }
}
