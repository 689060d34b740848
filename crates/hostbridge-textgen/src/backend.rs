//! Generation backend abstraction.
//!
//! The wrapper sequences calls; tokenization, decoding and logits come from
//! a backend. A model is loaded once; contexts are created per load.
//!
//! # Implementors
//!
//! - `NullBackend` (default): no model format is supported, every load fails.
//! - Bindings to a real inference library plug in through the same traits.

use crate::error::{GenResult, GenerationError};

/// Token id in the model's vocabulary
pub type Token = i32;

/// Inference context parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextParams {
    /// Context window in tokens
    pub n_ctx: u32,
    /// Threads used for single-token decode
    pub n_threads: u32,
    /// Threads used for batch (prompt) decode
    pub n_threads_batch: u32,
    /// Maximum tokens per decode call
    pub n_batch: u32,
}

impl ContextParams {
    /// Batch size follows the context size; both thread counts follow `threads`.
    pub fn new(context_size: u32, threads: u32) -> Self {
        Self {
            n_ctx: context_size,
            n_threads: threads,
            n_threads_batch: threads,
            n_batch: context_size,
        }
    }
}

/// Loads models
pub trait GenerationBackend {
    fn load_model(&self, path: &str) -> GenResult<Box<dyn Model>>;
}

/// A loaded model and its vocabulary
pub trait Model {
    fn vocab_size(&self) -> usize;

    /// Tokenize `text`. An empty result means tokenization failed.
    fn tokenize(&self, text: &str, add_special: bool) -> Vec<Token>;

    /// Text for one token, special tokens rendered
    fn token_to_piece(&self, token: Token) -> String;

    /// End-of-generation token
    fn is_eog(&self, token: Token) -> bool;

    fn new_context(&self, params: &ContextParams) -> GenResult<Box<dyn InferenceContext>>;
}

/// Decoding state for one model
pub trait InferenceContext {
    fn n_ctx(&self) -> u32;

    /// Feed `tokens`; afterwards `logits()` describe the next token.
    fn decode(&mut self, tokens: &[Token]) -> GenResult<()>;

    /// Logits for the last decoded position, one per vocabulary entry
    fn logits(&self) -> &[f32];
}

/// Backend with no supported model format
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl GenerationBackend for NullBackend {
    fn load_model(&self, path: &str) -> GenResult<Box<dyn Model>> {
        Err(GenerationError::ModelLoad(path.to_string()))
    }
}
