//! # hostbridge-textgen
//!
//! Thin stateful wrapper over a text-generation backend.
//!
//! All tokenization and decoding is delegated to a `GenerationBackend`;
//! this crate sequences the calls, samples from the logits, keeps a bounded
//! chat history and maps failures to a last-error string.

pub mod backend;
pub mod error;
pub mod generator;
pub mod history;
pub mod sampling;

pub use backend::{ContextParams, GenerationBackend, InferenceContext, Model, NullBackend, Token};
pub use error::{GenResult, GenerationError};
pub use generator::{
    TextGenerator, CHAT_MAX_TOKENS, DEFAULT_CONTEXT_SIZE, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
    DEFAULT_THREADS, DEFAULT_TOP_P,
};
pub use history::{ChatHistory, MAX_HISTORY_ENTRIES};
pub use sampling::{Sampler, SamplingParams, DEFAULT_SEED};
