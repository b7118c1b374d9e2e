//! Conversation context assembly with token budget enforcement
//!
//! This module turns a session's raw turn history into a single context blob
//! that fits a fixed token window: the most recent turns are kept verbatim,
//! older turns are compressed into a bounded summary, and the assembler
//! accounts for every token it emits.

pub mod assembler;
pub mod models;
pub mod summarizer;
pub mod token_budget;
pub mod token_estimator;

pub use assembler::ContextAssembler;
pub use models::{ContextResult, ConversationTurn, HistoryRecord, TurnRole};
pub use summarizer::TurnSummarizer;
pub use token_budget::{BudgetError, ContextBudget, ContextBudgetAllocator};
pub use token_estimator::{count_tokens, count_tokens_batch};
