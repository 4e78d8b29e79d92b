// Moderation domain models - data structures for the hate speech monitor.
//
// These are pure domain types with no platform dependencies.
// The adapter layer turns directives into platform-specific actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A chat message as handed to the engine by a platform adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub group_id: String,
    pub message_id: String,
    pub user_id: String,
    pub username: String,
    /// Absent for stickers, media, joins and so on.
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundMessage {
    /// The message text, if it has any non-empty content worth classifying.
    pub fn classifiable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Per-user violation history.
#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    pub violation_count: u64,
    pub last_violation_at: Option<DateTime<Utc>>,
}

/// A recipient of abuse alerts for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub admin_id: String,
    pub group_id: String,
    pub username: String,
}

/// Traffic counters for one group.
///
/// Invariant: `hate_speech_messages <= total_messages`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub total_messages: u64,
    pub hate_speech_messages: u64,
}

impl GroupStats {
    pub fn as_tuple(&self) -> (u64, u64) {
        (self.total_messages, self.hate_speech_messages)
    }
}

/// The enforcement tier chosen for a violation count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementAction {
    None,
    Restrict(Duration),
    Ban,
}

/// An instruction for the platform adapter. The engine never executes these itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Remove the offending message. Best-effort.
    DeleteMessage {
        group_id: String,
        message_id: String,
    },
    /// Alert a registered admin about the offending message.
    NotifyAdmin { admin_id: String, text: String },
    /// Mute the user in the group until `until`.
    Restrict {
        group_id: String,
        user_id: String,
        username: String,
        duration: Duration,
        until: DateTime<Utc>,
    },
    /// Remove the user from the group.
    Ban {
        group_id: String,
        user_id: String,
        username: String,
    },
}

impl Directive {
    /// Text announced to the group once a restrict or ban has been applied.
    pub fn group_announcement(&self) -> Option<(&str, String)> {
        match self {
            Directive::Restrict {
                group_id,
                username,
                duration,
                ..
            } => Some((
                group_id.as_str(),
                format!(
                    "User @{} is restricted for {} days.",
                    username,
                    duration.as_secs() / 86_400
                ),
            )),
            Directive::Ban {
                group_id, username, ..
            } => Some((
                group_id.as_str(),
                format!(
                    "User @{} has been banned due to repeated violations.",
                    username
                ),
            )),
            _ => None,
        }
    }
}

/// Outcome of one moderation pass.
#[derive(Debug, Clone, Default)]
pub struct ModerationOutcome {
    pub flagged: bool,
    /// Violation count after this pass. `None` for clean messages, and for
    /// flagged ones whose violation could not be recorded.
    pub violation_count: Option<u64>,
    pub directives: Vec<Directive>,
}

impl ModerationOutcome {
    pub fn clean() -> Self {
        Self::default()
    }
}
