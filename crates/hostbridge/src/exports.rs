//! Export table
//!
//! Binds entry point names to native functions. Both the legacy names
//! (`syncCallbackRead`, `libUvCaseFun`, ...) and the descriptive names
//! (`syncRead`, `eventLoopInvoke`, ...) are registered.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use hostbridge_core::error::{BridgeError, BridgeResult};
use hostbridge_core::{kdebug, Value};
use hostbridge_runtime::Env;
use hostbridge_textgen::TextGenerator;

use crate::bridge::{async_callback, async_promise, event_loop_case, sync_read, thread_safe, Counter};
use crate::textgen_bindings::{self as tg, SharedGenerator};

/// Native entry point
pub type NativeFn = Rc<dyn Fn(&Env, &[Value]) -> BridgeResult<Value>>;

pub struct Exports {
    table: BTreeMap<&'static str, NativeFn>,
    counter: Counter,
    generator: SharedGenerator,
}

impl Exports {
    fn define(&mut self, names: &[&'static str], f: NativeFn) {
        for name in names {
            self.table.insert(name, Rc::clone(&f));
        }
    }

    pub fn get(&self, name: &str) -> Option<&NativeFn> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.keys().copied()
    }

    /// Call an export by name.
    pub fn call(&self, env: &Env, name: &str, args: &[Value]) -> BridgeResult<Value> {
        env.check_thread()?;
        let f = self
            .table
            .get(name)
            .ok_or_else(|| BridgeError::CallFailed(format!("no export named '{}'", name)))?;
        f(env, args)
    }

    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    pub fn generator(&self) -> &SharedGenerator {
        &self.generator
    }
}

/// Build the export table around `generator`.
pub fn register(generator: TextGenerator) -> Exports {
    let mut exports = Exports {
        table: BTreeMap::new(),
        counter: Counter::new(),
        generator: Rc::new(RefCell::new(generator)),
    };

    exports.define(&["syncCallbackRead", "syncRead"], Rc::new(sync_read::sync_read));
    exports.define(
        &["asyncCallbackRead", "asyncReadCallback"],
        Rc::new(async_callback::async_read_callback),
    );
    exports.define(
        &["asyncPromiseRead", "asyncReadPromise"],
        Rc::new(async_promise::async_read_promise),
    );

    let counter = exports.counter.clone();
    exports.define(
        &["threadSafeCaseFun", "threadSafeInvoke"],
        Rc::new(move |env: &Env, args: &[Value]| thread_safe::thread_safe_invoke(env, args, &counter)),
    );
    let counter = exports.counter.clone();
    exports.define(
        &["libUvCaseFun", "eventLoopInvoke"],
        Rc::new(move |env: &Env, args: &[Value]| event_loop_case::event_loop_invoke(env, args, &counter)),
    );
    let counter = exports.counter.clone();
    exports.define(
        &["destroy"],
        Rc::new(move |_: &Env, _: &[Value]| {
            counter.reset();
            Ok(Value::Undefined)
        }),
    );

    let bindings: [(&'static str, fn(&SharedGenerator, &[Value]) -> BridgeResult<Value>); 8] = [
        ("loadModel", tg::load_model),
        ("generateText", tg::generate_text),
        ("chatCompletion", tg::chat_completion),
        ("clearChatHistory", tg::clear_chat_history),
        ("getModelInfo", tg::get_model_info),
        ("getLastError", tg::get_last_error),
        ("unloadModel", tg::unload_model),
        ("isModelLoaded", tg::is_model_loaded),
    ];
    for (name, binding) in bindings {
        let generator = Rc::clone(&exports.generator);
        exports.define(
            &[name],
            Rc::new(move |_: &Env, args: &[Value]| binding(&generator, args)),
        );
    }

    kdebug!("registered {} exports", exports.table.len());
    exports
}
