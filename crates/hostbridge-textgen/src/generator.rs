//! `TextGenerator`: load, generate, chat, unload.
//!
//! Failures never panic or propagate; they set a last-error string (also
//! logged) and the call returns `false` / an empty or partial string.

use std::fmt::Write;

use hostbridge_core::{kdebug, kerror};

use crate::backend::{ContextParams, GenerationBackend, InferenceContext, Model};
use crate::error::{GenResult, GenerationError};
use crate::history::ChatHistory;
use crate::sampling::{Sampler, SamplingParams, DEFAULT_SEED};

pub const DEFAULT_CONTEXT_SIZE: u32 = 2048;
pub const DEFAULT_THREADS: u32 = 4;
pub const DEFAULT_MAX_TOKENS: i32 = 100;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TOP_P: f32 = 0.95;

/// Tokens generated per chat turn
pub const CHAT_MAX_TOKENS: i32 = 150;

struct Loaded {
    model: Box<dyn Model>,
    context: Box<dyn InferenceContext>,
}

pub struct TextGenerator {
    backend: Box<dyn GenerationBackend>,
    loaded: Option<Loaded>,
    history: ChatHistory,
    last_error: String,
    seed: u32,
}

impl TextGenerator {
    pub fn new(backend: Box<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            loaded: None,
            history: ChatHistory::new(),
            last_error: String::new(),
            seed: DEFAULT_SEED,
        }
    }

    /// Fixed sampling seed for reproducible output
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Load a model, replacing any loaded one.
    pub fn load(&mut self, path: &str, context_size: u32, threads: u32) -> bool {
        if self.loaded.is_some() {
            self.unload();
        }

        let model = match self.backend.load_model(path) {
            Ok(model) => model,
            Err(_) => {
                self.set_error(GenerationError::ModelLoad(path.to_string()));
                return false;
            }
        };
        let params = ContextParams::new(context_size, threads);
        let context = match model.new_context(&params) {
            Ok(context) => context,
            Err(_) => {
                self.set_error(GenerationError::ContextCreate);
                return false;
            }
        };

        self.loaded = Some(Loaded { model, context });
        self.history.clear();
        self.last_error.clear();
        kdebug!("model loaded from {} (ctx {}, threads {})", path, context_size, threads);
        true
    }

    /// Drop model and context; also clears history.
    pub fn unload(&mut self) {
        if self.loaded.take().is_some() {
            kdebug!("model unloaded");
        }
        self.history.clear();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Generate up to `max_tokens` tokens continuing `prompt`.
    ///
    /// Returns `""` on failure before any token was produced, the partial
    /// text if a later decode fails.
    pub fn generate(&mut self, prompt: &str, max_tokens: i32, temperature: f32, top_p: f32) -> String {
        let params = SamplingParams::new(temperature, top_p).seed(self.seed);
        let mut text = String::new();
        match self.run_generation(prompt, max_tokens, params, &mut text) {
            Ok(()) => self.last_error.clear(),
            Err(e) => self.set_error(e),
        }
        text
    }

    fn run_generation(
        &mut self,
        prompt: &str,
        max_tokens: i32,
        params: SamplingParams,
        out: &mut String,
    ) -> GenResult<()> {
        let loaded = self.loaded.as_mut().ok_or(GenerationError::NotLoaded)?;
        let mut sampler = Sampler::new(params);

        let tokens = loaded.model.tokenize(prompt, true);
        if tokens.is_empty() {
            return Err(GenerationError::Tokenize);
        }
        loaded
            .context
            .decode(&tokens)
            .map_err(|_| GenerationError::PromptDecode)?;

        for _ in 0..max_tokens.max(0) {
            let Some(token) = sampler.sample(loaded.context.logits()) else {
                break;
            };
            if loaded.model.is_eog(token) {
                break;
            }
            out.push_str(&loaded.model.token_to_piece(token));
            loaded
                .context
                .decode(&[token])
                .map_err(|_| GenerationError::TokenDecode)?;
        }
        Ok(())
    }

    /// One chat turn against the rolling history.
    pub fn chat(&mut self, user_input: &str, system_prompt: &str) -> String {
        if !self.is_loaded() {
            self.set_error(GenerationError::NotLoaded);
            return String::new();
        }

        let prompt = self.chat_prompt(user_input, system_prompt);
        let response = self.generate(&prompt, CHAT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P);
        if !response.is_empty() {
            self.history.push_exchange(user_input, &response);
        }
        response
    }

    /// Prompt text for a chat turn
    pub fn chat_prompt(&self, user_input: &str, system_prompt: &str) -> String {
        let mut prompt = String::new();
        if !system_prompt.is_empty() {
            let _ = write!(prompt, "System: {}\n\n", system_prompt);
        }
        for entry in self.history.iter() {
            let _ = writeln!(prompt, "{}", entry);
        }
        let _ = write!(prompt, "User: {}\nAssistant: ", user_input);
        prompt
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn model_info(&self) -> String {
        match &self.loaded {
            None => "No model loaded".to_string(),
            Some(loaded) => format!(
                "Model loaded: Yes\nContext size: {}\nVocabulary size: {}\n",
                loaded.context.n_ctx(),
                loaded.model.vocab_size()
            ),
        }
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    fn set_error(&mut self, error: GenerationError) {
        kerror!("text generation: {}", error);
        self.last_error = error.to_string();
    }
}
