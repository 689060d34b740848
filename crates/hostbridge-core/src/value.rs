//! Managed values
//!
//! `Value` models what crosses the runtime boundary at a native entry point.
//! Functions and promises are reference-counted with `Rc`, so a `Value` is
//! `!Send`: the compiler keeps managed objects on the runtime thread.
//! Only `External` payloads (e.g. a resource manager) are shareable with
//! workers, and only through their own `Arc`.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};

/// Managed value
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Number(f64),
    String(String),
    /// Error object carrying a message
    Error(String),
    Function(Function),
    Promise(Promise),
    External(External),
}

/// Result of a `typeof` check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Object,
    Function,
    External,
}

impl Value {
    pub fn type_of(&self) -> ValueType {
        match self {
            Value::Undefined => ValueType::Undefined,
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Boolean,
            Value::Int(_) | Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Error(_) | Value::Promise(_) => ValueType::Object,
            Value::Function(_) => ValueType::Function,
            Value::External(_) => ValueType::External,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view. Whole-valued numbers in i32 range convert.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Number(n) if n.fract() == 0.0 && *n >= i32::MIN as f64 && *n <= i32::MAX as f64 => {
                Some(*n as i32)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Value::Promise(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_external(&self) -> Option<&External> {
        match self {
            Value::External(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Error(m) => write!(f, "Error({:?})", m),
            Value::Function(_) => write!(f, "[function]"),
            Value::Promise(p) => write!(f, "Promise {{ {:?} }}", p.state()),
            Value::External(_) => write!(f, "[external]"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) | (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<BridgeError> for Value {
    fn from(e: BridgeError) -> Self {
        Value::Error(e.to_string())
    }
}

// ============================================================================
// Function
// ============================================================================

type FnBody = dyn Fn(&[Value]) -> Value;

/// Managed function
#[derive(Clone)]
pub struct Function(Rc<FnBody>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        Self(Rc::new(f))
    }

    /// Invoke with `args`, returning the function's own return value
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

// ============================================================================
// Promise
// ============================================================================

/// Settlement state of a promise
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

/// Managed promise. Settled only through its `Deferred`.
#[derive(Clone)]
pub struct Promise {
    pub(crate) state: Rc<RefCell<PromiseState>>,
}

impl Promise {
    pub(crate) fn pending() -> Self {
        Self {
            state: Rc::new(RefCell::new(PromiseState::Pending)),
        }
    }

    pub fn state(&self) -> PromiseState {
        self.state.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Pending)
    }

    /// `Some(Ok)` when fulfilled, `Some(Err)` when rejected
    pub fn settled(&self) -> Option<Result<Value, Value>> {
        match &*self.state.borrow() {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(v) => Some(Ok(v.clone())),
            PromiseState::Rejected(v) => Some(Err(v.clone())),
        }
    }

    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}

// ============================================================================
// External
// ============================================================================

/// Opaque native payload held by a managed value
#[derive(Clone)]
pub struct External(Arc<dyn Any + Send + Sync>);

impl External {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl From<External> for Value {
    fn from(e: External) -> Self {
        Value::External(e)
    }
}

// ============================================================================
// Argument extraction
// ============================================================================

/// Typed access to entry point arguments
///
/// ```ignore
/// let args = Args::new(argv);
/// let name = args.string(0)?;
/// let callback = args.function(2)?;
/// let threads = args.opt_i32(2, 4)?;
/// ```
pub struct Args<'a> {
    argv: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(argv: &'a [Value]) -> Self {
        Self { argv }
    }

    pub fn len(&self) -> usize {
        self.argv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    pub fn get(&self, index: usize) -> BridgeResult<&'a Value> {
        self.argv.get(index).ok_or(BridgeError::MissingArgument(index))
    }

    /// Argument is present and not `undefined`
    pub fn has(&self, index: usize) -> bool {
        self.argv.get(index).map_or(false, |v| !v.is_undefined())
    }

    pub fn string(&self, index: usize) -> BridgeResult<&'a str> {
        self.get(index)?.as_str().ok_or(BridgeError::InvalidArgument {
            index,
            expected: "a string",
        })
    }

    pub fn function(&self, index: usize) -> BridgeResult<Function> {
        self.get(index)?
            .as_function()
            .cloned()
            .ok_or(BridgeError::InvalidArgument {
                index,
                expected: "a function",
            })
    }

    pub fn external(&self, index: usize) -> BridgeResult<&'a External> {
        self.get(index)?.as_external().ok_or(BridgeError::InvalidArgument {
            index,
            expected: "an external handle",
        })
    }

    pub fn opt_string(&self, index: usize, default: &str) -> BridgeResult<String> {
        if !self.has(index) {
            return Ok(default.to_string());
        }
        self.string(index).map(str::to_string)
    }

    pub fn opt_i32(&self, index: usize, default: i32) -> BridgeResult<i32> {
        if !self.has(index) {
            return Ok(default);
        }
        self.get(index)?.as_i32().ok_or(BridgeError::InvalidArgument {
            index,
            expected: "an integer",
        })
    }

    pub fn opt_f64(&self, index: usize, default: f64) -> BridgeResult<f64> {
        if !self.has(index) {
            return Ok(default);
        }
        self.get(index)?.as_f64().ok_or(BridgeError::InvalidArgument {
            index,
            expected: "a number",
        })
    }

    /// Optional function argument; `None` when absent or `undefined`
    pub fn opt_function(&self, index: usize) -> BridgeResult<Option<Function>> {
        if !self.has(index) {
            return Ok(None);
        }
        self.function(index).map(Some)
    }
}
