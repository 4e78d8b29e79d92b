// Directive dispatch - runs the engine's directives against a platform adapter.
//
// Each directive is attempted independently: a failed delete or a failed alert
// to one admin is logged and the rest of the batch still runs.

use super::moderation_models::Directive;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Platform error: {0}")]
    Platform(String),
}

/// The actions a chat platform must support for moderation.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    async fn delete_message(&self, group_id: &str, message_id: &str) -> Result<(), AdapterError>;

    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), AdapterError>;

    async fn restrict_user(
        &self,
        group_id: &str,
        user_id: &str,
        until: DateTime<Utc>,
    ) -> Result<(), AdapterError>;

    async fn ban_user(&self, group_id: &str, user_id: &str) -> Result<(), AdapterError>;
}

/// How many directives of a batch went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Execute directives in order. Never stops early.
pub async fn dispatch<A>(adapter: &A, directives: &[Directive]) -> DispatchReport
where
    A: PlatformAdapter + ?Sized,
{
    let mut report = DispatchReport::default();

    for directive in directives {
        match execute(adapter, directive).await {
            Ok(()) => {
                report.succeeded += 1;

                if let Some((group_id, text)) = directive.group_announcement() {
                    if let Err(e) = adapter.send_message(group_id, &text).await {
                        tracing::warn!("Failed to announce enforcement in {}: {}", group_id, e);
                    }
                }
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!("Failed to execute {:?}: {}", directive, e);
            }
        }
    }

    report
}

async fn execute<A>(adapter: &A, directive: &Directive) -> Result<(), AdapterError>
where
    A: PlatformAdapter + ?Sized,
{
    match directive {
        Directive::DeleteMessage {
            group_id,
            message_id,
        } => adapter.delete_message(group_id, message_id).await,
        Directive::NotifyAdmin { admin_id, text } => adapter.send_message(admin_id, text).await,
        Directive::Restrict {
            group_id,
            user_id,
            until,
            ..
        } => adapter.restrict_user(group_id, user_id, *until).await,
        Directive::Ban {
            group_id, user_id, ..
        } => adapter.ban_user(group_id, user_id).await,
    }
}
