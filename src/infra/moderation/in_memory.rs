// In-memory implementation of the moderation stores.
//
// Useful for tests and for running without a database file. Nothing survives
// a restart.
//
// **DashMap:**
// Every counter update goes through `entry()`, which holds the shard lock for
// that key while the closure runs. That makes each increment a single atomic
// read-modify-write, so concurrent messages never lose a count.

use crate::core::moderation::{
    AdminRecord, AdminRegistry, GroupStats, StatsStore, StoreError, UserRecord, ViolationStore,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

/// A composite key for admin records.
/// The same person can be an admin of several groups.
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct AdminKey {
    admin_id: String,
    group_id: String,
}

pub struct InMemoryModerationStore {
    /// user_id -> violation history
    users: DashMap<String, UserRecord>,
    /// group_id -> counters
    stats: DashMap<String, GroupStats>,
    /// (admin_id, group_id) -> username
    admins: DashMap<AdminKey, String>,
}

impl InMemoryModerationStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            stats: DashMap::new(),
            admins: DashMap::new(),
        }
    }
}

impl Default for InMemoryModerationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ViolationStore for InMemoryModerationStore {
    async fn add_violation(&self, user_id: &str, username: &str) -> Result<u64, StoreError> {
        let now = Utc::now();

        let record = self
            .users
            .entry(user_id.to_string())
            .and_modify(|record| {
                record.violation_count = record.violation_count.saturating_add(1);
                record.last_violation_at = Some(now);
            })
            .or_insert_with(|| UserRecord {
                user_id: user_id.to_string(),
                username: username.to_string(),
                violation_count: 1,
                last_violation_at: Some(now),
            });

        Ok(record.violation_count)
    }

    async fn get_violation_count(&self, user_id: &str) -> Result<u64, StoreError> {
        Ok(self
            .users
            .get(user_id)
            .map(|record| record.violation_count)
            .unwrap_or(0))
    }
}

#[async_trait]
impl StatsStore for InMemoryModerationStore {
    async fn increment_message_stats(
        &self,
        group_id: &str,
        is_hate_speech: bool,
    ) -> Result<(), StoreError> {
        let mut stats = self.stats.entry(group_id.to_string()).or_default();
        stats.total_messages += 1;
        if is_hate_speech {
            stats.hate_speech_messages += 1;
        }
        Ok(())
    }

    async fn get_stats(&self, group_id: &str) -> Result<GroupStats, StoreError> {
        Ok(self
            .stats
            .get(group_id)
            .map(|stats| *stats)
            .unwrap_or_default())
    }
}

#[async_trait]
impl AdminRegistry for InMemoryModerationStore {
    async fn add_admin(
        &self,
        admin_id: &str,
        group_id: &str,
        username: &str,
    ) -> Result<(), StoreError> {
        let key = AdminKey {
            admin_id: admin_id.to_string(),
            group_id: group_id.to_string(),
        };
        self.admins.insert(key, username.to_string());
        Ok(())
    }

    async fn remove_admin(&self, admin_id: &str, group_id: &str) -> Result<(), StoreError> {
        let key = AdminKey {
            admin_id: admin_id.to_string(),
            group_id: group_id.to_string(),
        };
        self.admins.remove(&key);
        Ok(())
    }

    async fn list_admins(&self, group_id: &str) -> Result<Vec<AdminRecord>, StoreError> {
        let mut admins: Vec<AdminRecord> = self
            .admins
            .iter()
            .filter(|entry| entry.key().group_id == group_id)
            .map(|entry| AdminRecord {
                admin_id: entry.key().admin_id.clone(),
                group_id: entry.key().group_id.clone(),
                username: entry.value().clone(),
            })
            .collect();

        admins.sort_by(|a, b| a.admin_id.cmp(&b.admin_id));
        Ok(admins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_violation_counts() {
        let store = InMemoryModerationStore::new();

        assert_eq!(store.get_violation_count("u1").await.unwrap(), 0);

        for expected in 1..=5 {
            assert_eq!(store.add_violation("u1", "alice").await.unwrap(), expected);
        }
        assert_eq!(store.get_violation_count("u1").await.unwrap(), 5);
        assert_eq!(store.get_violation_count("u2").await.unwrap(), 0);

        let record = store.users.get("u1").unwrap();
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.username, "alice");
        assert!(record.last_violation_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_violations_are_not_lost() {
        let store = Arc::new(InMemoryModerationStore::new());
        let k = 64;

        let handles: Vec<_> = (0..k)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add_violation("u1", "alice").await.unwrap() })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            assert!(seen.insert(handle.await.unwrap()));
        }

        assert_eq!(seen, (1..=k).collect::<HashSet<u64>>());
        assert_eq!(store.get_violation_count("u1").await.unwrap(), k);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stats_are_not_lost() {
        let store = Arc::new(InMemoryModerationStore::new());

        let handles: Vec<_> = (0..200)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .increment_message_stats("g1", i % 4 == 0)
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get_stats("g1").await.unwrap().as_tuple(), (200, 50));
        assert_eq!(store.stats.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = InMemoryModerationStore::new();

        assert_eq!(store.get_stats("g1").await.unwrap().as_tuple(), (0, 0));

        store.increment_message_stats("g1", true).await.unwrap();
        store.increment_message_stats("g1", false).await.unwrap();
        store.increment_message_stats("g2", false).await.unwrap();

        assert_eq!(store.get_stats("g1").await.unwrap().as_tuple(), (2, 1));
        assert_eq!(store.get_stats("g2").await.unwrap().as_tuple(), (1, 0));
    }

    #[tokio::test]
    async fn test_admin_registry() {
        let store = InMemoryModerationStore::new();

        store.add_admin("a2", "g1", "bob").await.unwrap();
        store.add_admin("a1", "g1", "alice").await.unwrap();
        store.add_admin("a1", "g1", "alice_renamed").await.unwrap();
        store.add_admin("a1", "g2", "alice").await.unwrap();

        let admins = store.list_admins("g1").await.unwrap();
        assert_eq!(admins.len(), 2);
        assert_eq!(admins[0].admin_id, "a1");
        assert_eq!(admins[0].username, "alice_renamed");
        assert_eq!(admins[1].admin_id, "a2");

        store.remove_admin("nobody", "g1").await.unwrap();
        store.remove_admin("a1", "g1").await.unwrap();
        let admins = store.list_admins("g1").await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(store.list_admins("g2").await.unwrap().len(), 1);
        assert!(store.list_admins("g3").await.unwrap().is_empty());
    }
}
