//! TextGenerator against a scripted backend.

use std::cell::RefCell;
use std::rc::Rc;

use hostbridge_textgen::{
    ContextParams, GenResult, GenerationBackend, GenerationError, InferenceContext, Model,
    TextGenerator, Token, MAX_HISTORY_ENTRIES,
};

const EOG: Token = 0;

/// What the scripted model does
#[derive(Clone, Default)]
struct Script {
    /// Pieces produced in order, then end-of-generation
    reply: Vec<&'static str>,
    fail_load: bool,
    fail_context: bool,
    empty_tokenize: bool,
    fail_prompt_decode: bool,
    /// Fail the token decode after this many succeeded
    fail_token_decode_after: Option<usize>,
}

struct ScriptedBackend {
    script: Script,
    prompts: Rc<RefCell<Vec<String>>>,
}

struct ScriptedModel {
    script: Script,
    prompts: Rc<RefCell<Vec<String>>>,
}

struct ScriptedContext {
    script: Script,
    n_ctx: u32,
    generated: usize,
    logits: Vec<f32>,
}

impl ScriptedModel {
    fn bos(&self) -> Token {
        self.script.reply.len() as Token + 1
    }
}

impl GenerationBackend for ScriptedBackend {
    fn load_model(&self, path: &str) -> GenResult<Box<dyn Model>> {
        if self.script.fail_load {
            return Err(GenerationError::ModelLoad(path.to_string()));
        }
        Ok(Box::new(ScriptedModel {
            script: self.script.clone(),
            prompts: Rc::clone(&self.prompts),
        }))
    }
}

impl Model for ScriptedModel {
    fn vocab_size(&self) -> usize {
        self.script.reply.len() + 2
    }

    fn tokenize(&self, text: &str, add_special: bool) -> Vec<Token> {
        self.prompts.borrow_mut().push(text.to_string());
        if self.script.empty_tokenize {
            return Vec::new();
        }
        let mut tokens = Vec::new();
        if add_special {
            tokens.push(self.bos());
        }
        tokens.extend(text.split_whitespace().map(|_| 1));
        tokens
    }

    fn token_to_piece(&self, token: Token) -> String {
        self.script
            .reply
            .get(token as usize - 1)
            .map(|s| s.to_string())
            .unwrap_or_default()
    }

    fn is_eog(&self, token: Token) -> bool {
        token == EOG
    }

    fn new_context(&self, params: &ContextParams) -> GenResult<Box<dyn InferenceContext>> {
        if self.script.fail_context {
            return Err(GenerationError::ContextCreate);
        }
        Ok(Box::new(ScriptedContext {
            script: self.script.clone(),
            n_ctx: params.n_ctx,
            generated: 0,
            logits: Vec::new(),
        }))
    }
}

impl ScriptedContext {
    fn bos(&self) -> Token {
        self.script.reply.len() as Token + 1
    }

    /// One-hot logits on the next scripted piece, or on EOG when done
    fn point_at_next(&mut self) {
        let vocab = self.script.reply.len() + 2;
        let next = if self.generated < self.script.reply.len() {
            self.generated + 1
        } else {
            EOG as usize
        };
        self.logits = vec![0.0; vocab];
        self.logits[next] = 100.0;
    }
}

impl InferenceContext for ScriptedContext {
    fn n_ctx(&self) -> u32 {
        self.n_ctx
    }

    fn decode(&mut self, tokens: &[Token]) -> GenResult<()> {
        if tokens.first() == Some(&self.bos()) {
            if self.script.fail_prompt_decode {
                return Err(GenerationError::Backend("prompt rejected".into()));
            }
            self.generated = 0;
        } else {
            if Some(self.generated) == self.script.fail_token_decode_after {
                return Err(GenerationError::Backend("kv cache full".into()));
            }
            self.generated += 1;
        }
        self.point_at_next();
        Ok(())
    }

    fn logits(&self) -> &[f32] {
        &self.logits
    }
}

fn generator(script: Script) -> (TextGenerator, Rc<RefCell<Vec<String>>>) {
    let prompts = Rc::new(RefCell::new(Vec::new()));
    let backend = ScriptedBackend {
        script,
        prompts: Rc::clone(&prompts),
    };
    (TextGenerator::new(Box::new(backend)).with_seed(1234), prompts)
}

fn hello_script() -> Script {
    Script {
        reply: vec!["Hi", " there", ",", " friend", "!"],
        ..Script::default()
    }
}

#[test]
fn generate_before_load_reports_not_loaded() {
    let (mut gen, _) = generator(hello_script());
    assert_eq!(gen.generate("Hello", 10, 0.8, 0.95), "");
    assert_eq!(gen.last_error(), "Model not loaded");
    assert!(!gen.is_loaded());
}

#[test]
fn load_generate_unload_scenario() {
    let (mut gen, _) = generator(hello_script());
    assert!(gen.load("model.bin", 2048, 4));
    assert!(gen.is_loaded());

    let text = gen.generate("Hello", 10, 0.8, 0.95);
    assert_eq!(text, "Hi there, friend!");
    assert_eq!(gen.last_error(), "");

    gen.unload();
    assert_eq!(gen.generate("Hello", 10, 0.8, 0.95), "");
    assert!(!gen.last_error().is_empty());
}

#[test]
fn max_tokens_caps_output() {
    let (mut gen, _) = generator(hello_script());
    assert!(gen.load("model.bin", 2048, 4));
    assert_eq!(gen.generate("Hello", 2, 0.8, 0.95), "Hi there");
    assert_eq!(gen.generate("Hello", 0, 0.8, 0.95), "");
    assert_eq!(gen.last_error(), "");
}

#[test]
fn load_failures_set_last_error() {
    let (mut gen, _) = generator(Script {
        fail_load: true,
        ..hello_script()
    });
    assert!(!gen.load("missing.bin", 2048, 4));
    assert_eq!(gen.last_error(), "Failed to load model from: missing.bin");
    assert!(!gen.is_loaded());

    let (mut gen, _) = generator(Script {
        fail_context: true,
        ..hello_script()
    });
    assert!(!gen.load("model.bin", 2048, 4));
    assert_eq!(gen.last_error(), "Failed to create context");
    assert!(!gen.is_loaded());
}

#[test]
fn tokenize_and_prompt_decode_failures() {
    let (mut gen, _) = generator(Script {
        empty_tokenize: true,
        ..hello_script()
    });
    assert!(gen.load("model.bin", 2048, 4));
    assert_eq!(gen.generate("Hello", 10, 0.8, 0.95), "");
    assert_eq!(gen.last_error(), "Failed to tokenize prompt");

    let (mut gen, _) = generator(Script {
        fail_prompt_decode: true,
        ..hello_script()
    });
    assert!(gen.load("model.bin", 2048, 4));
    assert_eq!(gen.generate("Hello", 10, 0.8, 0.95), "");
    assert_eq!(gen.last_error(), "Failed to process prompt tokens");
}

#[test]
fn token_decode_failure_keeps_partial_text() {
    let (mut gen, _) = generator(Script {
        fail_token_decode_after: Some(2),
        ..hello_script()
    });
    assert!(gen.load("model.bin", 2048, 4));
    assert_eq!(gen.generate("Hello", 10, 0.8, 0.95), "Hi there,");
    assert_eq!(gen.last_error(), "Failed to decode token");
}

#[test]
fn chat_prompt_includes_system_and_history() {
    let (mut gen, prompts) = generator(hello_script());
    assert!(gen.load("model.bin", 2048, 4));

    assert_eq!(gen.chat("Hello", "Be brief."), "Hi there, friend!");
    assert_eq!(
        prompts.borrow().last().map(String::as_str),
        Some("System: Be brief.\n\nUser: Hello\nAssistant: ")
    );

    gen.chat("Again", "");
    assert_eq!(
        prompts.borrow().last().map(String::as_str),
        Some("User: Hello\nAssistant: Hi there, friend!\nUser: Again\nAssistant: ")
    );
    assert_eq!(gen.history().len(), 4);
}

#[test]
fn chat_history_is_bounded_fifo() {
    let (mut gen, _) = generator(hello_script());
    assert!(gen.load("model.bin", 2048, 4));
    for i in 0..25 {
        gen.chat(&format!("question {}", i), "");
        assert!(gen.history().len() <= MAX_HISTORY_ENTRIES);
    }
    assert_eq!(gen.history().len(), MAX_HISTORY_ENTRIES);
    assert_eq!(gen.history().iter().next(), Some("User: question 15"));

    gen.clear_history();
    assert!(gen.history().is_empty());
}

#[test]
fn empty_chat_response_is_not_recorded() {
    let (mut gen, _) = generator(Script::default());
    assert!(gen.load("model.bin", 2048, 4));
    assert_eq!(gen.chat("Hello", ""), "");
    assert!(gen.history().is_empty());
}

#[test]
fn chat_before_load_reports_not_loaded() {
    let (mut gen, _) = generator(hello_script());
    assert_eq!(gen.chat("Hello", ""), "");
    assert_eq!(gen.last_error(), "Model not loaded");
}

#[test]
fn model_info_and_reload_reset_state() {
    let (mut gen, _) = generator(hello_script());
    assert_eq!(gen.model_info(), "No model loaded");

    assert!(gen.load("model.bin", 1024, 2));
    assert_eq!(
        gen.model_info(),
        "Model loaded: Yes\nContext size: 1024\nVocabulary size: 7\n"
    );

    gen.chat("Hello", "");
    assert_eq!(gen.history().len(), 2);
    gen.generate("Hello", 10, 0.8, 0.95);

    assert!(gen.load("model.bin", 2048, 4));
    assert!(gen.history().is_empty());
    assert_eq!(gen.last_error(), "");

    gen.chat("Hello", "");
    gen.unload();
    assert!(gen.history().is_empty());
    assert_eq!(gen.model_info(), "No model loaded");
}
