// HTTP client for a hosted text-classification model (e.g. `unitary/toxic-bert`
// on the Hugging Face inference API).
//
// The model returns a score per label; a message counts as hate speech when any
// of the configured labels scores strictly above the threshold.

use crate::core::moderation::{Classifier, ClassifierError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Inference endpoints wrap the scores in one list per input, but some
/// deployments return a flat list for single inputs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Batched(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl ClassificationResponse {
    fn into_scores(self) -> Vec<LabelScore> {
        match self {
            ClassificationResponse::Batched(batches) => {
                batches.into_iter().next().unwrap_or_default()
            }
            ClassificationResponse::Flat(scores) => scores,
        }
    }
}

pub struct ToxicityClient {
    client: Client,
    endpoint: String,
    api_token: Option<String>,
    labels: HashSet<String>,
    threshold: f64,
}

impl ToxicityClient {
    pub fn new(
        endpoint: String,
        api_token: Option<String>,
        labels: impl IntoIterator<Item = String>,
        threshold: f64,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_token,
            labels: labels.into_iter().map(|l| l.to_lowercase()).collect(),
            threshold,
        }
    }

    /// Whether any configured label scores above the threshold.
    pub fn is_hateful(&self, scores: &[LabelScore]) -> bool {
        scores.iter().any(|s| {
            self.labels.contains(&s.label.to_lowercase()) && s.score > self.threshold
        })
    }
}

#[async_trait]
impl Classifier for ToxicityClient {
    async fn classify(&self, text: &str) -> Result<bool, ClassifierError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&json!({ "inputs": text }));

        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClassifierError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Request(format!("{} - {}", status, body)));
        }

        let parsed: ClassificationResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Response(e.to_string()))?;

        let scores = parsed.into_scores();
        tracing::debug!("Classifier scores: {:?}", scores);
        Ok(self.is_hateful(&scores))
    }
}
