// Platform adapter that only logs what it would have done.

use crate::core::moderation::{AdapterError, PlatformAdapter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub struct LogAdapter;

#[async_trait]
impl PlatformAdapter for LogAdapter {
    async fn delete_message(&self, group_id: &str, message_id: &str) -> Result<(), AdapterError> {
        tracing::info!("[delete] group={} message={}", group_id, message_id);
        Ok(())
    }

    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), AdapterError> {
        tracing::info!("[send] to={} text={:?}", recipient_id, text);
        Ok(())
    }

    async fn restrict_user(
        &self,
        group_id: &str,
        user_id: &str,
        until: DateTime<Utc>,
    ) -> Result<(), AdapterError> {
        tracing::info!(
            "[restrict] group={} user={} until={}",
            group_id,
            user_id,
            until.to_rfc3339()
        );
        Ok(())
    }

    async fn ban_user(&self, group_id: &str, user_id: &str) -> Result<(), AdapterError> {
        tracing::info!("[ban] group={} user={}", group_id, user_id);
        Ok(())
    }
}
