// Moderation engine - core business logic for the hate speech monitor.
//
// For every inbound message the engine:
// - records the message in the group's traffic stats
// - asks the classifier whether the text is abusive
// - for abusive messages, bumps the sender's violation count and emits
//   directives (delete, alert admins, restrict/ban) for the adapter to run
//
// NO platform dependencies here - the engine only decides, it never acts.

use super::enforcement_policy;
use super::moderation_models::{
    AdminRecord, Directive, EnforcementAction, GroupStats, InboundMessage, ModerationOutcome,
};
use super::moderation_store::{AdminRegistry, ModerationStore, StatsStore, ViolationStore};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// CLASSIFIER (PORT)
// ============================================================================

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier request failed: {0}")]
    Request(String),

    #[error("Unexpected classifier response: {0}")]
    Response(String),
}

/// Decides whether a piece of text is abusive.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<bool, ClassifierError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Stateless orchestrator over the violation, stats and admin stores.
///
/// Storage failures never escape the engine: they are logged and replaced by
/// a safe default (0, empty list, `false`, zeroed stats).
#[derive(Clone)]
pub struct ModerationEngine {
    violations: Arc<dyn ViolationStore>,
    stats: Arc<dyn StatsStore>,
    admins: Arc<dyn AdminRegistry>,
    classifier: Arc<dyn Classifier>,
}

impl ModerationEngine {
    pub fn new(
        violations: Arc<dyn ViolationStore>,
        stats: Arc<dyn StatsStore>,
        admins: Arc<dyn AdminRegistry>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            violations,
            stats,
            admins,
            classifier,
        }
    }

    /// Build an engine whose three stores live in one backend.
    pub fn with_store<S>(store: Arc<S>, classifier: Arc<dyn Classifier>) -> Self
    where
        S: ModerationStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, classifier)
    }

    /// Classify a message and run a full moderation pass over it.
    pub async fn moderate(&self, message: &InboundMessage) -> ModerationOutcome {
        let flagged = match message.classifiable_text() {
            Some(text) => match self.classifier.classify(text).await {
                Ok(flagged) => flagged,
                Err(e) => {
                    tracing::warn!(
                        "Classifier failed for message {} in group {}, treating as clean: {}",
                        message.message_id,
                        message.group_id,
                        e
                    );
                    false
                }
            },
            None => false,
        };

        self.apply_verdict(message, flagged).await
    }

    /// Run a moderation pass with a verdict the caller already obtained.
    ///
    /// Messages without text are never treated as flagged.
    pub async fn apply_verdict(&self, message: &InboundMessage, flagged: bool) -> ModerationOutcome {
        let flagged = flagged && message.classifiable_text().is_some();

        // One increment per message: total always, hate speech only when flagged.
        if let Err(e) = self
            .stats
            .increment_message_stats(&message.group_id, flagged)
            .await
        {
            tracing::warn!(
                "Failed to record message stats for group {}: {}",
                message.group_id,
                e
            );
        }

        if !flagged {
            tracing::debug!(
                "Message {} in group {} is clean",
                message.message_id,
                message.group_id
            );
            return ModerationOutcome::clean();
        }

        let violation_count = match self
            .violations
            .add_violation(&message.user_id, &message.username)
            .await
        {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(
                    "Failed to record violation for user {}: {}",
                    message.user_id,
                    e
                );
                None
            }
        };

        tracing::info!(
            "Hate speech from {} ({}) in group {}, violation #{:?}",
            message.username,
            message.user_id,
            message.group_id,
            violation_count
        );

        let mut directives = vec![Directive::DeleteMessage {
            group_id: message.group_id.clone(),
            message_id: message.message_id.clone(),
        }];

        let alert = format!(
            "⚠️ Alert: User @{} sent hate speech:\n{}",
            message.username,
            message.text.as_deref().unwrap_or_default()
        );
        directives.extend(
            self.list_admins(&message.group_id)
                .await
                .into_iter()
                .map(|admin_id| Directive::NotifyAdmin {
                    admin_id,
                    text: alert.clone(),
                }),
        );

        // Without a known count there is nothing to escalate on.
        let action = violation_count
            .map(enforcement_policy::decide)
            .unwrap_or(EnforcementAction::None);

        match action {
            EnforcementAction::None => {}
            EnforcementAction::Restrict(duration) => {
                tracing::info!(
                    "Restricting {} in group {} for {:?}",
                    message.user_id,
                    message.group_id,
                    duration
                );
                let offset = chrono::Duration::from_std(duration)
                    .unwrap_or_else(|_| chrono::Duration::zero());
                directives.push(Directive::Restrict {
                    group_id: message.group_id.clone(),
                    user_id: message.user_id.clone(),
                    username: message.username.clone(),
                    duration,
                    until: Utc::now() + offset,
                });
            }
            EnforcementAction::Ban => {
                tracing::info!("Banning {} from group {}", message.user_id, message.group_id);
                directives.push(Directive::Ban {
                    group_id: message.group_id.clone(),
                    user_id: message.user_id.clone(),
                    username: message.username.clone(),
                });
            }
        }

        ModerationOutcome {
            flagged: true,
            violation_count,
            directives,
        }
    }

    // ------------------------------------------------------------------------
    // Admin management and statistics
    // ------------------------------------------------------------------------

    /// Register (or rename) an alert recipient for a group.
    pub async fn add_admin(&self, admin_id: &str, group_id: &str, username: &str) -> bool {
        match self.admins.add_admin(admin_id, group_id, username).await {
            Ok(()) => {
                tracing::info!("Admin {} registered for group {}", admin_id, group_id);
                true
            }
            Err(e) => {
                tracing::error!("Failed to add admin {} to group {}: {}", admin_id, group_id, e);
                false
            }
        }
    }

    pub async fn remove_admin(&self, admin_id: &str, group_id: &str) {
        if let Err(e) = self.admins.remove_admin(admin_id, group_id).await {
            tracing::error!(
                "Failed to remove admin {} from group {}: {}",
                admin_id,
                group_id,
                e
            );
        }
    }

    /// Admin ids registered for a group; empty on storage failure.
    pub async fn list_admins(&self, group_id: &str) -> Vec<String> {
        self.list_admin_records(group_id)
            .await
            .into_iter()
            .map(|record| record.admin_id)
            .collect()
    }

    /// Full admin records (with usernames) for a group; empty on storage failure.
    pub async fn list_admin_records(&self, group_id: &str) -> Vec<AdminRecord> {
        self.admins
            .list_admins(group_id)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Failed to list admins for group {}: {}", group_id, e);
                Vec::new()
            })
    }

    pub async fn group_stats(&self, group_id: &str) -> GroupStats {
        self.stats.get_stats(group_id).await.unwrap_or_else(|e| {
            tracing::error!("Failed to get stats for group {}: {}", group_id, e);
            GroupStats::default()
        })
    }

    pub async fn violation_count(&self, user_id: &str) -> u64 {
        self.violations
            .get_violation_count(user_id)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("Failed to get violation count for {}: {}", user_id, e);
                0
            })
    }

    /// Human-readable statistics for a group, including the asker's own violations.
    pub async fn stats_report(&self, group_id: &str, user_id: &str) -> String {
        let stats = self.group_stats(group_id).await;
        let violations = self.violation_count(user_id).await;

        format!(
            "📊 Group Statistics:\nTotal Messages: {}\nHate Speech Messages: {}\nYour Violations: {}",
            stats.total_messages, stats.hate_speech_messages, violations
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
