// Runtime configuration, read from the environment (and `.env` via dotenv).

use anyhow::Context;

pub const DEFAULT_DATABASE: &str = "hate_speech.db";
pub const DEFAULT_CLASSIFIER_URL: &str =
    "https://api-inference.huggingface.co/models/unitary/toxic-bert";
pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_LABELS: &str = "toxic,hate";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite path or URL; `:memory:` keeps everything in process memory.
    pub database: String,
    pub classifier_url: String,
    pub classifier_api_token: Option<String>,
    pub classifier_labels: Vec<String>,
    pub hate_speech_threshold: f64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let hate_speech_threshold = match non_empty("HATE_SPEECH_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("HATE_SPEECH_THRESHOLD is not a number: {}", raw))?,
            None => DEFAULT_THRESHOLD,
        };
        if !(0.0..=1.0).contains(&hate_speech_threshold) {
            anyhow::bail!(
                "HATE_SPEECH_THRESHOLD must be between 0 and 1, got {}",
                hate_speech_threshold
            );
        }

        let classifier_labels = non_empty("CLASSIFIER_LABELS")
            .unwrap_or_else(|| DEFAULT_LABELS.to_string())
            .split(',')
            .map(|label| label.trim().to_lowercase())
            .filter(|label| !label.is_empty())
            .collect();

        Ok(Self {
            database: non_empty("MODERATION_DATABASE")
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            classifier_url: non_empty("CLASSIFIER_URL")
                .unwrap_or_else(|| DEFAULT_CLASSIFIER_URL.to_string()),
            classifier_api_token: non_empty("CLASSIFIER_API_TOKEN"),
            classifier_labels,
            hate_speech_threshold,
        })
    }

    pub fn uses_in_memory_store(&self) -> bool {
        self.database.contains(":memory:")
    }
}
