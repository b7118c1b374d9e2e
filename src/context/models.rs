//! Data models for context assembly

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token_estimator::count_tokens;

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Display label used when rendering transcripts
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

/// One message in a conversation, with its token cost fixed at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,
    pub role: TurnRole,
    pub content: String,
    pub tokens: usize,
}

impl ConversationTurn {
    /// Create a turn, estimating its token cost from the content.
    ///
    /// The count is not recomputed later; the allocator and assembler rely on
    /// it staying in sync with `content`.
    pub fn new(timestamp: DateTime<Utc>, role: TurnRole, content: String) -> Self {
        let tokens = count_tokens(&content);
        Self {
            timestamp,
            role,
            content,
            tokens,
        }
    }
}

/// Raw history item as supplied by the calling service.
///
/// `timestamp` is an optional RFC 3339 string; unparseable or missing values
/// are absorbed (the assembler substitutes the current time).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HistoryRecord {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Assembled context plus accounting metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextResult {
    pub text: String,
    pub total_tokens: usize,
    pub recent_message_count: usize,
    pub summary_tokens: usize,
    /// True iff any turns were pushed into the summarized older bucket
    pub truncated: bool,
}
