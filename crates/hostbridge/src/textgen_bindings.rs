//! Entry points over a shared `TextGenerator`.
//!
//! Generation is synchronous on the runtime thread. Failures inside the
//! generator surface through `getLastError()`; only argument errors are
//! returned as `Err`.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::{Args, Value};
use hostbridge_textgen::{
    TextGenerator, DEFAULT_CONTEXT_SIZE, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_THREADS,
    DEFAULT_TOP_P,
};

pub type SharedGenerator = Rc<RefCell<TextGenerator>>;

fn borrow(gen: &SharedGenerator) -> BridgeResult<RefMut<'_, TextGenerator>> {
    gen.try_borrow_mut()
        .map_err(|_| BridgeError::CallFailed("text generator is busy".into()))
}

fn positive(args: &Args<'_>, index: usize, default: u32) -> BridgeResult<u32> {
    let v = args.opt_i32(index, default as i32)?;
    u32::try_from(v)
        .ok()
        .filter(|v| *v > 0)
        .ok_or(BridgeError::InvalidArgument {
            index,
            expected: "a positive integer",
        })
}

/// `loadModel(path, contextSize = 2048, threads = 4) -> bool`
pub fn load_model(gen: &SharedGenerator, argv: &[Value]) -> BridgeResult<Value> {
    let args = Args::new(argv);
    let path = args.string(0)?;
    let context_size = positive(&args, 1, DEFAULT_CONTEXT_SIZE)?;
    let threads = positive(&args, 2, DEFAULT_THREADS)?;
    Ok(Value::Bool(borrow(gen)?.load(path, context_size, threads)))
}

/// `generateText(prompt, maxTokens = 100, temperature = 0.8, topP = 0.95) -> string`
pub fn generate_text(gen: &SharedGenerator, argv: &[Value]) -> BridgeResult<Value> {
    let args = Args::new(argv);
    let prompt = args.string(0)?;
    let max_tokens = args.opt_i32(1, DEFAULT_MAX_TOKENS)?;
    let temperature = args.opt_f64(2, f64::from(DEFAULT_TEMPERATURE))? as f32;
    let top_p = args.opt_f64(3, f64::from(DEFAULT_TOP_P))? as f32;
    let text = borrow(gen)?.generate(prompt, max_tokens, temperature, top_p);
    Ok(Value::String(text))
}

/// `chatCompletion(userInput, systemPrompt = "") -> string`
pub fn chat_completion(gen: &SharedGenerator, argv: &[Value]) -> BridgeResult<Value> {
    let args = Args::new(argv);
    let user_input = args.string(0)?;
    let system_prompt = args.opt_string(1, "")?;
    Ok(Value::String(borrow(gen)?.chat(user_input, &system_prompt)))
}

pub fn clear_chat_history(gen: &SharedGenerator, _argv: &[Value]) -> BridgeResult<Value> {
    borrow(gen)?.clear_history();
    Ok(Value::Undefined)
}

pub fn get_model_info(gen: &SharedGenerator, _argv: &[Value]) -> BridgeResult<Value> {
    Ok(Value::String(borrow(gen)?.model_info()))
}

pub fn get_last_error(gen: &SharedGenerator, _argv: &[Value]) -> BridgeResult<Value> {
    Ok(Value::String(borrow(gen)?.last_error().to_string()))
}

pub fn unload_model(gen: &SharedGenerator, _argv: &[Value]) -> BridgeResult<Value> {
    borrow(gen)?.unload();
    Ok(Value::Undefined)
}

pub fn is_model_loaded(gen: &SharedGenerator, _argv: &[Value]) -> BridgeResult<Value> {
    Ok(Value::Bool(borrow(gen)?.is_loaded()))
}
