//! Summarization of older conversation turns
//!
//! Two strategies: a generative one through the injected [`TextGenerator`],
//! and a deterministic extractive fallback. Summarization is never a hard
//! failure point — generator errors are logged and absorbed.

use std::sync::Arc;

use tracing::{debug, warn};

use super::models::{ConversationTurn, TurnRole};
use super::token_estimator::count_tokens;
use crate::llm::generator::{Generation, GeneratorError, TextGenerator};

/// Instruction template for the generative strategy
const SUMMARY_INSTRUCTION: &str = "Summarize the troubleshooting conversation above into a \
concise running summary. Preserve: the problem description and symptoms, findings and \
diagnostics performed, decisions made, the current investigation status, and open questions.";

/// Sampling temperature for summarization calls; low to bias toward
/// deterministic output.
const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Characters shown of the first user turn in the extractive problem bullet
const PROBLEM_SNIPPET_CHARS: usize = 200;

/// Compresses older turns (plus an optional running summary) into a bounded
/// text blob.
pub struct TurnSummarizer {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl TurnSummarizer {
    /// Summarizer backed by a text-generation capability, with the extractive
    /// strategy as fallback.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Purely extractive summarizer, no external dependency.
    pub fn extractive() -> Self {
        Self { generator: None }
    }

    /// Summarize `turns` into at most `max_tokens` (estimated), folding in
    /// `existing_summary` when present.
    ///
    /// Never fails: with no turns the existing summary (or an empty string)
    /// is returned unchanged, and any generator error falls back to the
    /// extractive strategy.
    pub async fn summarize(
        &self,
        turns: &[ConversationTurn],
        max_tokens: usize,
        existing_summary: Option<&str>,
    ) -> String {
        if turns.is_empty() {
            return existing_summary.unwrap_or_default().to_string();
        }

        if let Some(generator) = &self.generator {
            match self
                .generate_summary(generator.as_ref(), turns, max_tokens, existing_summary)
                .await
            {
                Ok(summary) if !summary.trim().is_empty() => {
                    debug!(
                        turns = turns.len(),
                        tokens = count_tokens(&summary),
                        "generative summary produced"
                    );
                    return summary;
                }
                Ok(_) => {
                    warn!("generator returned an empty summary, using extractive fallback");
                }
                Err(e) => {
                    warn!(error = %e, "generative summarization failed, using extractive fallback");
                }
            }
        }

        self.extract_summary(turns, max_tokens, existing_summary)
    }

    async fn generate_summary(
        &self,
        generator: &dyn TextGenerator,
        turns: &[ConversationTurn],
        max_tokens: usize,
        existing_summary: Option<&str>,
    ) -> Result<String, GeneratorError> {
        let mut transcript = String::new();
        if let Some(summary) = existing_summary {
            if !summary.is_empty() {
                transcript.push_str("Summary so far:\n");
                transcript.push_str(summary);
                transcript.push_str("\n\n");
            }
        }
        for turn in turns {
            transcript.push_str(&format!(
                "[{}] {}: {}\n",
                turn.timestamp.format("%H:%M"),
                turn.role.label(),
                turn.content
            ));
        }

        let prompt = format!(
            "{transcript}\n{SUMMARY_INSTRUCTION} Keep the summary under {max_tokens} tokens."
        );

        let Generation { content } = generator
            .generate(&prompt, max_tokens, SUMMARY_TEMPERATURE)
            .await?;
        Ok(content.trim().to_string())
    }

    /// Deterministic extractive fallback: existing summary verbatim, a
    /// problem bullet from the first user turn, and a diagnostics-count
    /// bullet for longer histories, truncated to the token cap with a 90%
    /// safety margin under the 4-chars/token estimate.
    fn extract_summary(
        &self,
        turns: &[ConversationTurn],
        max_tokens: usize,
        existing_summary: Option<&str>,
    ) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(summary) = existing_summary {
            if !summary.is_empty() {
                parts.push(summary.to_string());
            }
        }

        if let Some(first_user) = turns.iter().find(|t| t.role == TurnRole::User) {
            let snippet: String = first_user.content.chars().take(PROBLEM_SNIPPET_CHARS).collect();
            parts.push(format!("• Problem: {snippet}..."));
        }

        if turns.len() > 2 {
            parts.push(format!(
                "• {} earlier turns of troubleshooting diagnostics were exchanged",
                turns.len()
            ));
        }

        let mut summary = parts.join("\n");
        if count_tokens(&summary) > max_tokens {
            let limit = (max_tokens as f64 * 4.0 * 0.9).floor() as usize;
            summary = summary.chars().take(limit).collect();
            summary.push_str("...");
        }
        summary
    }
}
