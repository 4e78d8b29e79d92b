// This is the entry point of the hate speech monitor.
//
// **Architecture Overview:**
// - `core/` = Moderation logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite, in-memory, HTTP classifier)
// - `console/` = A JSON-lines adapter standing in for a chat platform
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize stores and the classifier (dependency injection)
// 3. Hand stdin/stdout to the console adapter

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "console/console_layer.rs"]
mod console;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::AppConfig;
use crate::console::log_adapter::LogAdapter;
use crate::core::moderation::ModerationEngine;
use crate::infra::classifier::ToxicityClient;
use crate::infra::moderation::{InMemoryModerationStore, SqliteModerationStore};
use std::sync::Arc;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Stores and classifier are built once here and passed into the engine.

    let classifier = Arc::new(ToxicityClient::new(
        config.classifier_url.clone(),
        config.classifier_api_token.clone(),
        config.classifier_labels.clone(),
        config.hate_speech_threshold,
    ));

    let engine = if config.uses_in_memory_store() {
        tracing::warn!("Using in-memory store; nothing will be persisted");
        ModerationEngine::with_store(Arc::new(InMemoryModerationStore::new()), classifier)
    } else {
        let store = SqliteModerationStore::new(&config.database).await?;
        tracing::info!("Moderation database ready at {}", config.database);
        ModerationEngine::with_store(Arc::new(store), classifier)
    };

    tracing::info!(
        "Hate speech monitor started (classifier: {}, threshold: {})",
        config.classifier_url,
        config.hate_speech_threshold
    );

    console::events::run(
        engine,
        Arc::new(LogAdapter),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;

    tracing::info!("Input closed, shutting down");
    Ok(())
}
