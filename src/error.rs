//! Crate-level error type

use thiserror::Error;

use crate::context::token_budget::BudgetError;
use crate::llm::generator::GeneratorError;

/// Errors surfaced by the context core
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
