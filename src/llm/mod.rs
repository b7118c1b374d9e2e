//! LLM capability boundary and call protection
//!
//! The rest of the crate only sees [`TextGenerator`], a one-method capability
//! injected by the host. This module also provides an OpenAI-compatible
//! implementation of it and the circuit breaker that guards calls to the
//! upstream model.

pub mod circuit_breaker;
pub mod generator;
pub mod guarded;
pub mod openai_compat;

pub use circuit_breaker::{
    BreakerError, BreakerState, BreakerStatus, CallDecision, CircuitBreakerConfig, Clock,
    FailureKind, LlmCircuitBreaker, SystemClock,
};
pub use generator::{FailureClass, Generation, GeneratorError, TextGenerator};
pub use guarded::GuardedGenerator;
pub use openai_compat::{GeneratorConfig, OpenAiCompatGenerator};
