//! Generation errors
//!
//! `Display` yields the exact last-error text callers read back through
//! `TextGenerator::last_error()`.

use core::fmt;

pub type GenResult<T> = Result<T, GenerationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Backend could not load the model file
    ModelLoad(String),
    /// Model loaded but no inference context could be created
    ContextCreate,
    /// Generation requested before a successful load
    NotLoaded,
    /// Prompt produced no tokens
    Tokenize,
    /// Decoding the prompt batch failed
    PromptDecode,
    /// Decoding a sampled token failed
    TokenDecode,
    /// Backend-specific failure
    Backend(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::ModelLoad(path) => write!(f, "Failed to load model from: {}", path),
            GenerationError::ContextCreate => write!(f, "Failed to create context"),
            GenerationError::NotLoaded => write!(f, "Model not loaded"),
            GenerationError::Tokenize => write!(f, "Failed to tokenize prompt"),
            GenerationError::PromptDecode => write!(f, "Failed to process prompt tokens"),
            GenerationError::TokenDecode => write!(f, "Failed to decode token"),
            GenerationError::Backend(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GenerationError {}
