//! Text-generation capability boundary

use async_trait::async_trait;

use super::circuit_breaker::FailureKind;

/// One completed generation from the model
#[derive(Debug, Clone)]
pub struct Generation {
    pub content: String,
}

/// Narrow capability for invoking a text-generation model.
///
/// The summarizer and the assembler depend on this abstraction only, never on
/// a concrete vendor client; the host injects whichever implementation it
/// configured.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
    ) -> Result<Generation, GeneratorError>;
}

/// Text-generation errors
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("initialization error: {0}")]
    Initialization(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("circuit breaker is open: {0}")]
    CircuitOpen(String),

    #[error("empty completion from model")]
    EmptyCompletion,
}

/// Classification of an operation error into a breaker failure kind.
///
/// The breaker has no visibility into the wrapped operation; its caller
/// classifies the error before reporting it.
pub trait FailureClass {
    fn failure_kind(&self) -> FailureKind;
}

impl FailureClass for GeneratorError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            GeneratorError::Timeout(_) => FailureKind::Timeout,
            _ => FailureKind::Error,
        }
    }
}
