//! Circuit-breaker-wrapped text generation

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::warn;

use super::circuit_breaker::{BreakerStatus, CallDecision, LlmCircuitBreaker};
use super::generator::{FailureClass, Generation, GeneratorError, TextGenerator};

/// [`TextGenerator`] decorator that gates every call through a circuit
/// breaker.
///
/// Rejected calls never reach the inner generator; allowed calls are timed
/// and their outcome reported back to the breaker with the classified
/// failure kind.
pub struct GuardedGenerator {
    inner: Arc<dyn TextGenerator>,
    breaker: Arc<LlmCircuitBreaker>,
}

impl GuardedGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, breaker: Arc<LlmCircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    /// Breaker snapshot, for the surrounding service's observability
    pub fn breaker_status(&self) -> BreakerStatus {
        self.breaker.get_status()
    }
}

#[async_trait]
impl TextGenerator for GuardedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
    ) -> Result<Generation, GeneratorError> {
        match self.breaker.can_execute() {
            CallDecision::Rejected { reason, .. } => {
                warn!(%reason, "generation call rejected by circuit breaker");
                Err(GeneratorError::CircuitOpen(reason))
            }
            CallDecision::Allowed => {
                let start = Instant::now();
                match self.inner.generate(prompt, max_tokens, temperature).await {
                    Ok(generation) => {
                        self.breaker.record_success(start.elapsed());
                        Ok(generation)
                    }
                    Err(e) => {
                        self.breaker.record_failure(e.failure_kind(), &e.to_string());
                        Err(e)
                    }
                }
            }
        }
    }
}
