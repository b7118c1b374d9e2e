//! FaultMaven context core
//!
//! The two reusable cores of the FaultMaven troubleshooting assistant:
//!
//! - [`context`]: token-budgeted conversation context assembly — splitting a
//!   session's turn history into a verbatim recent window and a summarized
//!   older window, then packing both into a fixed token budget.
//! - [`llm`]: the text-generation capability boundary, an OpenAI-compatible
//!   client, and a circuit breaker guarding calls to the (possibly slow or
//!   failing) upstream model.
//!
//! The surrounding service owns session persistence, prompt templates, and
//! the HTTP surface; this crate only takes caller-owned history in and hands
//! an assembled context blob (plus accounting metadata) back.

pub mod context;
pub mod error;
pub mod llm;

pub use context::{
    ContextAssembler, ContextBudget, ContextBudgetAllocator, ContextResult, ConversationTurn,
    HistoryRecord, TurnRole, TurnSummarizer,
};
pub use error::{ContextError, Result};
pub use llm::{
    BreakerState, BreakerStatus, CallDecision, CircuitBreakerConfig, FailureKind, Generation,
    GeneratorError, GuardedGenerator, LlmCircuitBreaker, OpenAiCompatGenerator, TextGenerator,
};
