// Console event loop - reads JSON lines and routes them into the core.
//
// Chat messages are moderated on their own tasks so a slow classifier call
// doesn't hold up the rest of the stream. Admin commands are answered inline.

use crate::core::moderation::{dispatch, InboundMessage, ModerationEngine, PlatformAdapter};
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;

/// One line of console input.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsoleEvent {
    Message(InboundMessage),
    AddAdmin {
        group_id: String,
        admin_id: String,
        #[serde(default)]
        username: Option<String>,
    },
    RemoveAdmin {
        group_id: String,
        admin_id: String,
    },
    ListAdmins {
        group_id: String,
    },
    Stats {
        group_id: String,
        user_id: String,
    },
}

/// Process every line from `input` until EOF, writing command replies to `output`.
///
/// Returns once all spawned moderation passes have finished.
pub async fn run<R, W>(
    engine: ModerationEngine,
    adapter: Arc<dyn PlatformAdapter>,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut passes = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<ConsoleEvent>(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Skipping malformed line: {}", e);
                continue;
            }
        };

        match event {
            ConsoleEvent::Message(message) => {
                let engine = engine.clone();
                let adapter = Arc::clone(&adapter);
                passes.spawn(async move {
                    moderate_and_dispatch(&engine, adapter.as_ref(), &message).await;
                });
                reap_finished(&mut passes);
            }
            command => {
                let reply = handle_command(&engine, command).await;
                output.write_all(reply.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
        }
    }

    while let Some(result) = passes.join_next().await {
        if let Err(e) = result {
            tracing::error!("Moderation task panicked: {}", e);
        }
    }

    Ok(())
}

/// Drop completed passes from the set without waiting, reporting panics.
/// Returns how many passes are still running.
fn reap_finished(passes: &mut JoinSet<()>) -> usize {
    while let Some(result) = passes.try_join_next() {
        if let Err(e) = result {
            tracing::error!("Moderation task panicked: {}", e);
        }
    }
    passes.len()
}

/// Run one moderation pass and carry out whatever it decided.
pub async fn moderate_and_dispatch(
    engine: &ModerationEngine,
    adapter: &dyn PlatformAdapter,
    message: &InboundMessage,
) {
    let outcome = engine.moderate(message).await;
    if outcome.directives.is_empty() {
        return;
    }
    if outcome.flagged {
        tracing::debug!(
            "Dispatching {} directives for {} (violation #{})",
            outcome.directives.len(),
            message.user_id,
            outcome.violation_count.unwrap_or(0)
        );
    }

    let report = dispatch(adapter, &outcome.directives).await;
    if report.failed > 0 {
        tracing::warn!(
            "{} of {} directives failed for message {}",
            report.failed,
            report.failed + report.succeeded,
            message.message_id
        );
    }
}

async fn handle_command(engine: &ModerationEngine, command: ConsoleEvent) -> String {
    match command {
        ConsoleEvent::AddAdmin {
            group_id,
            admin_id,
            username,
        } => {
            let display_name = username.unwrap_or_else(|| admin_id.clone());
            if engine.add_admin(&admin_id, &group_id, &display_name).await {
                format!(
                    "✅ Admin {} (ID: {}) added successfully.",
                    display_name, admin_id
                )
            } else {
                "❌ Failed to add admin. Please try again.".to_string()
            }
        }
        ConsoleEvent::RemoveAdmin { group_id, admin_id } => {
            engine.remove_admin(&admin_id, &group_id).await;
            format!("Admin {} removed from this group.", admin_id)
        }
        ConsoleEvent::ListAdmins { group_id } => {
            let admins = engine.list_admin_records(&group_id).await;
            if admins.is_empty() {
                return "📋 No registered admins found for this group.".to_string();
            }

            let mut list = String::from("📋 Registered Group Admins:");
            for admin in admins {
                let name = if admin.username.is_empty() {
                    "Unknown"
                } else {
                    admin.username.as_str()
                };
                list.push_str(&format!("\n• {} - ID: {}", name, admin.admin_id));
            }
            list
        }
        ConsoleEvent::Stats { group_id, user_id } => engine.stats_report(&group_id, &user_id).await,
        ConsoleEvent::Message(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::log_adapter::LogAdapter;
    use crate::core::moderation::{Classifier, ClassifierError};
    use crate::infra::moderation::InMemoryModerationStore;
    use async_trait::async_trait;

    /// Flags anything containing "vermin".
    struct KeywordClassifier;

    #[async_trait]
    impl Classifier for KeywordClassifier {
        async fn classify(&self, text: &str) -> Result<bool, ClassifierError> {
            Ok(text.contains("vermin"))
        }
    }

    fn engine() -> ModerationEngine {
        ModerationEngine::with_store(
            Arc::new(InMemoryModerationStore::new()),
            Arc::new(KeywordClassifier),
        )
    }

    async fn run_lines(engine: &ModerationEngine, input: &str) -> String {
        let mut output = Vec::new();
        run(
            engine.clone(),
            Arc::new(LogAdapter),
            input.as_bytes(),
            &mut output,
        )
        .await
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    fn message_line(id: u32, user: &str, text: &str) -> String {
        format!(
            r#"{{"kind":"message","group_id":"g1","message_id":"m{}","user_id":"{}","username":"{}","text":"{}"}}"#,
            id, user, user, text
        )
    }

    #[tokio::test]
    async fn test_messages_update_stats() {
        let engine = engine();
        let input = [
            message_line(1, "u1", "hello"),
            message_line(2, "u1", "you vermin"),
            "not json at all".to_string(),
            message_line(3, "u2", "good evening"),
        ]
        .join("\n");

        let replies = run_lines(&engine, &input).await;

        assert!(replies.is_empty());
        assert_eq!(engine.group_stats("g1").await.as_tuple(), (3, 1));
        assert_eq!(engine.violation_count("u1").await, 1);
        assert_eq!(engine.violation_count("u2").await, 0);
    }

    #[tokio::test]
    async fn test_finished_passes_are_reaped() {
        let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut passes = JoinSet::new();

        for _ in 0..20 {
            for _ in 0..50 {
                let done_tx = done_tx.clone();
                passes.spawn(async move {
                    let _ = done_tx.send(());
                });
            }
            for _ in 0..50 {
                done_rx.recv().await.unwrap();
            }
            // Single-threaded runtime: a task that has sent has also returned.
            assert_eq!(reap_finished(&mut passes), 0);
        }

        passes.spawn(async { panic!("classifier exploded") });
        while reap_finished(&mut passes) > 0 {
            tokio::task::yield_now().await;
        }
        assert!(passes.is_empty());
    }

    #[tokio::test]
    async fn test_admin_commands() {
        let engine = engine();
        let input = [
            r#"{"kind":"list_admins","group_id":"g1"}"#,
            r#"{"kind":"add_admin","group_id":"g1","admin_id":"42","username":"carol"}"#,
            r#"{"kind":"add_admin","group_id":"g1","admin_id":"7"}"#,
            r#"{"kind":"list_admins","group_id":"g1"}"#,
            r#"{"kind":"remove_admin","group_id":"g1","admin_id":"42"}"#,
        ]
        .join("\n");

        let replies = run_lines(&engine, &input).await;
        let replies: Vec<&str> = replies.split('\n').collect();

        assert_eq!(replies[0], "📋 No registered admins found for this group.");
        assert_eq!(replies[1], "✅ Admin carol (ID: 42) added successfully.");
        assert_eq!(replies[2], "✅ Admin 7 (ID: 7) added successfully.");
        assert_eq!(replies[3], "📋 Registered Group Admins:");
        assert_eq!(replies[4], "• carol - ID: 42");
        assert_eq!(replies[5], "• 7 - ID: 7");
        assert_eq!(replies[6], "Admin 42 removed from this group.");
        assert_eq!(engine.list_admins("g1").await, vec!["7".to_string()]);
    }

    #[tokio::test]
    async fn test_stats_command() {
        let engine = engine();
        engine
            .apply_verdict(
                &InboundMessage {
                    group_id: "g1".to_string(),
                    message_id: "m1".to_string(),
                    user_id: "u1".to_string(),
                    username: "alice".to_string(),
                    text: Some("vermin".to_string()),
                },
                true,
            )
            .await;

        let replies = run_lines(
            &engine,
            r#"{"kind":"stats","group_id":"g1","user_id":"u1"}"#,
        )
        .await;

        assert_eq!(
            replies.trim_end(),
            "📊 Group Statistics:\nTotal Messages: 1\nHate Speech Messages: 1\nYour Violations: 1"
        );
    }
}
