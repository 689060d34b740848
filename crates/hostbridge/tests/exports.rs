//! Export table surface.

use hostbridge::{register, NullBackend, Runtime, RuntimeConfig, TextGenerator, Value};
use hostbridge_runtime::InlinePool;

const BRIDGE_NAMES: [(&str, &str); 5] = [
    ("syncCallbackRead", "syncRead"),
    ("asyncCallbackRead", "asyncReadCallback"),
    ("asyncPromiseRead", "asyncReadPromise"),
    ("threadSafeCaseFun", "threadSafeInvoke"),
    ("libUvCaseFun", "eventLoopInvoke"),
];

const TEXTGEN_NAMES: [&str; 8] = [
    "loadModel",
    "generateText",
    "chatCompletion",
    "clearChatHistory",
    "getModelInfo",
    "getLastError",
    "unloadModel",
    "isModelLoaded",
];

#[test]
fn both_name_sets_share_one_function() {
    let ex = register(TextGenerator::new(Box::new(NullBackend)));
    for (legacy, descriptive) in BRIDGE_NAMES {
        let a = ex.get(legacy).unwrap();
        let b = ex.get(descriptive).unwrap();
        assert!(std::rc::Rc::ptr_eq(a, b), "{} / {}", legacy, descriptive);
    }
    for name in TEXTGEN_NAMES {
        assert!(ex.contains(name), "{}", name);
    }
    assert!(ex.contains("destroy"));
    assert_eq!(ex.names().count(), BRIDGE_NAMES.len() * 2 + TEXTGEN_NAMES.len() + 1);
}

#[test]
fn text_generation_without_backend() {
    let rt = Runtime::with_pool(RuntimeConfig::new(), Box::new(InlinePool::new())).unwrap();
    let ex = register(TextGenerator::new(Box::new(NullBackend)));
    let env = rt.env();

    assert_eq!(ex.call(env, "isModelLoaded", &[]).unwrap(), Value::Bool(false));
    assert_eq!(
        ex.call(env, "loadModel", &[Value::from("/models/tiny.gguf")]).unwrap(),
        Value::Bool(false)
    );
    assert_eq!(
        ex.call(env, "getLastError", &[]).unwrap(),
        Value::from("Failed to load model from: /models/tiny.gguf")
    );
    assert_eq!(
        ex.call(env, "generateText", &[Value::from("Once upon")]).unwrap(),
        Value::from("")
    );
    assert_eq!(
        ex.call(env, "getLastError", &[]).unwrap(),
        Value::from("Model not loaded")
    );
    assert_eq!(
        ex.call(env, "getModelInfo", &[]).unwrap(),
        Value::from("No model loaded")
    );
    assert!(ex.call(env, "clearChatHistory", &[]).unwrap().is_undefined());
    assert!(ex.call(env, "unloadModel", &[]).unwrap().is_undefined());
}
