//! Token budget configuration and the recent/older turn split
//!
//! The budget reserves a verbatim allowance for the most recent turns and a
//! summary allowance for everything older. The allocator fills the recent
//! window greedily from the newest turn backward; it never drops the
//! guaranteed tail even when that tail alone overflows the reservation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::ConversationTurn;

/// Token budget for one context assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBudget {
    /// Cap on the whole assembled context
    pub max_total_tokens: usize,
    /// Tokens guaranteed to verbatim recent turns
    pub reserved_for_recent: usize,
    /// Cap on the summary of older turns
    pub max_summary_tokens: usize,
    /// Most-recent turns always kept regardless of size
    pub min_recent_messages: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            max_total_tokens: 1500,
            reserved_for_recent: 750,
            max_summary_tokens: 600,
            min_recent_messages: 2,
        }
    }
}

impl ContextBudget {
    /// Validate that the budget configuration is consistent.
    ///
    /// Rejects a recent reservation larger than the total window, which would
    /// otherwise drive the summary allowance negative.
    pub fn validate(&self) -> Result<(), BudgetError> {
        if self.reserved_for_recent > self.max_total_tokens {
            return Err(BudgetError::ConfigurationInvalid {
                reserved: self.reserved_for_recent,
                max: self.max_total_tokens,
            });
        }
        Ok(())
    }

    /// Tokens available for the summary of older turns
    pub fn available_for_summary(&self) -> usize {
        self.max_summary_tokens
            .min(self.max_total_tokens.saturating_sub(self.reserved_for_recent))
    }
}

/// Token budget errors
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("budget invalid: reserved_for_recent ({reserved}) exceeds max_total_tokens ({max})")]
    ConfigurationInvalid { reserved: usize, max: usize },
}

/// Splits an ordered turn history into verbatim-recent and to-summarize-older
pub struct ContextBudgetAllocator;

impl ContextBudgetAllocator {
    /// Partition `turns` (oldest first) into `(recent, older)`.
    ///
    /// The last `min_recent_messages` turns are always kept, even past the
    /// reservation. Walking backward from there, each earlier turn is kept
    /// while it fits the remaining reservation; the first turn that does not
    /// fit halts the walk, so a single oversized turn blocks everything older
    /// than it. Greedy and O(n), not a knapsack solve. Both outputs preserve
    /// chronological order.
    pub fn split(
        mut turns: Vec<ConversationTurn>,
        budget: &ContextBudget,
    ) -> (Vec<ConversationTurn>, Vec<ConversationTurn>) {
        if turns.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let min_messages = budget.min_recent_messages.min(turns.len());
        let mut cut = turns.len() - min_messages;

        let recent_tokens: usize = turns[cut..].iter().map(|t| t.tokens).sum();
        // May already be negative when the mandatory tail overflows the
        // reservation; tracked signed so that case adds nothing further.
        let mut remaining = budget.reserved_for_recent as i64 - recent_tokens as i64;

        while cut > 0 {
            let candidate = &turns[cut - 1];
            if remaining > 0 && candidate.tokens as i64 <= remaining {
                remaining -= candidate.tokens as i64;
                cut -= 1;
            } else {
                break;
            }
        }

        let recent = turns.split_off(cut);
        (recent, turns)
    }
}
