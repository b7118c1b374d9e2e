//! Context assembly orchestration
//!
//! Composes the allocator and summarizer into one final context blob plus
//! accounting metadata. The assembler degrades gracefully: blank history
//! items are skipped, bad timestamps are replaced with the current time, and
//! summarization failures fall back to the extractive strategy inside the
//! summarizer. The only hard failure is an invalid budget.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::models::{ContextResult, ConversationTurn, HistoryRecord, TurnRole};
use super::summarizer::TurnSummarizer;
use super::token_budget::{ContextBudget, ContextBudgetAllocator};
use super::token_estimator::count_tokens;
use crate::error::Result;

/// Assembles a token-budgeted context blob from raw conversation history
pub struct ContextAssembler {
    summarizer: TurnSummarizer,
}

impl ContextAssembler {
    pub fn new(summarizer: TurnSummarizer) -> Self {
        Self { summarizer }
    }

    /// Assembler with the extractive summarizer only, no LLM dependency.
    pub fn extractive() -> Self {
        Self::new(TurnSummarizer::extractive())
    }

    /// Build the context for one prompt.
    ///
    /// `existing_summary` is the running summary the caller persisted from a
    /// previous build, if any; `case_title` prepends a case header line.
    /// Fails only on an invalid `budget`.
    pub async fn build(
        &self,
        history: &[HistoryRecord],
        budget: &ContextBudget,
        existing_summary: Option<&str>,
        case_title: Option<&str>,
    ) -> Result<ContextResult> {
        budget.validate()?;

        if history.is_empty() {
            return Ok(ContextResult::default());
        }

        let turns = parse_history(history);
        if turns.is_empty() {
            return Ok(ContextResult::default());
        }

        let (recent, older) = ContextBudgetAllocator::split(turns, budget);
        debug!(
            recent = recent.len(),
            older = older.len(),
            "allocated turns against budget"
        );

        let mut result = ContextResult {
            recent_message_count: recent.len(),
            truncated: !older.is_empty(),
            ..Default::default()
        };
        let mut parts: Vec<String> = Vec::new();

        if let Some(title) = case_title.filter(|t| !t.trim().is_empty()) {
            let header = format!("Troubleshooting Case: {title}\n");
            result.total_tokens += count_tokens(&header);
            parts.push(header);
        }

        if !older.is_empty() {
            let summary = self
                .summarizer
                .summarize(&older, budget.available_for_summary(), existing_summary)
                .await;
            if !summary.is_empty() {
                let block = format!("Previous conversation summary:\n{summary}\n");
                result.summary_tokens = count_tokens(&block);
                result.total_tokens += result.summary_tokens;
                parts.push(block);
            }
        }

        if !recent.is_empty() {
            let mut lines = vec!["Recent conversation:".to_string()];
            for (i, turn) in recent.iter().enumerate() {
                lines.push(format!(
                    "{}. [{}] {}: {}",
                    i + 1,
                    turn.timestamp.format("%H:%M"),
                    turn.role.label(),
                    turn.content
                ));
            }
            lines.push(String::new());
            parts.push(lines.join("\n"));
            result.total_tokens += recent.iter().map(|t| t.tokens).sum::<usize>();
        }

        result.text = parts.join("\n");
        debug!(
            total_tokens = result.total_tokens,
            summary_tokens = result.summary_tokens,
            truncated = result.truncated,
            "context assembled"
        );
        Ok(result)
    }
}

/// Parse raw history items into turns, absorbing malformed input: items with
/// blank content are skipped, unknown roles map to the assistant, and
/// missing or unparseable timestamps become the current time.
fn parse_history(history: &[HistoryRecord]) -> Vec<ConversationTurn> {
    history
        .iter()
        .filter_map(|record| {
            let content = record.content.trim();
            if content.is_empty() {
                return None;
            }
            let role = if record.role.eq_ignore_ascii_case("user") {
                TurnRole::User
            } else {
                TurnRole::Assistant
            };
            let timestamp = record
                .timestamp
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            Some(ConversationTurn::new(timestamp, role, content.to_string()))
        })
        .collect()
}
