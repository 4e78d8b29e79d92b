// Storage traits (ports) for the moderation system.
//
// Every mutation here is scoped to a single key and must be atomic on its own:
// implementations may not split a counter update into a read followed by a write.

use super::moderation_models::{AdminRecord, GroupStats};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Durable per-user violation counters.
#[async_trait]
pub trait ViolationStore: Send + Sync {
    /// Increment the user's violation count, stamp the violation time and
    /// return the new count. Creates the user record on first violation.
    async fn add_violation(&self, user_id: &str, username: &str) -> Result<u64, StoreError>;

    /// Current violation count; 0 for unknown users.
    async fn get_violation_count(&self, user_id: &str) -> Result<u64, StoreError>;
}

/// Durable per-group message counters.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Upsert the group's row and bump `total_messages` by one, and
    /// `hate_speech_messages` by one when `is_hate_speech` is set.
    async fn increment_message_stats(
        &self,
        group_id: &str,
        is_hate_speech: bool,
    ) -> Result<(), StoreError>;

    /// Counters for the group; zeroes for unseen groups.
    async fn get_stats(&self, group_id: &str) -> Result<GroupStats, StoreError>;
}

/// Durable per-group set of alert recipients.
#[async_trait]
pub trait AdminRegistry: Send + Sync {
    /// Insert or replace the `(admin_id, group_id)` record.
    async fn add_admin(
        &self,
        admin_id: &str,
        group_id: &str,
        username: &str,
    ) -> Result<(), StoreError>;

    /// Delete the record if present. Missing records are not an error.
    async fn remove_admin(&self, admin_id: &str, group_id: &str) -> Result<(), StoreError>;

    /// Admin records registered for the group, ordered by admin id.
    async fn list_admins(&self, group_id: &str) -> Result<Vec<AdminRecord>, StoreError>;
}

/// A backend that provides all three stores, e.g. one SQLite database.
pub trait ModerationStore: ViolationStore + StatsStore + AdminRegistry {}

impl<T: ViolationStore + StatsStore + AdminRegistry> ModerationStore for T {}
