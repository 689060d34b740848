//! Continuations held across a thread boundary
//!
//! A continuation is created on the runtime thread when a bridge is entered
//! and consumed on the runtime thread when the result arrives. All three
//! types here are `!Send` (they wrap managed values) and move-only: the
//! delivery methods take `self`, so a second delivery does not compile.
//!
//! ```text
//!   entry point            worker thread            runtime thread
//!   ───────────            ─────────────            ──────────────
//!   Continuation::new ──►  (carries id only)  ──►   continuation.call(args)
//!   Promise::deferred ──►  (carries id only)  ──►   deferred.resolve(value)
//! ```

use std::rc::Rc;

use crate::error::{BridgeError, BridgeResult};
use crate::id::InvocationId;
use crate::kwarn;
use crate::value::{Function, Promise, PromiseState, Value};

/// Strong reference to an arbitrary managed value
///
/// Holds the value alive until released. Callers that expect a function
/// check it at use time with `into_continuation()`.
pub struct Reference {
    value: Value,
}

impl Reference {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Release the reference, returning the held value
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Convert to a callable continuation if the held value is a function
    pub fn into_continuation(self, id: InvocationId) -> BridgeResult<Continuation> {
        match self.value {
            Value::Function(func) => Ok(Continuation::new(id, func)),
            _ => Err(BridgeError::InvalidArgument {
                index: 0,
                expected: "a function",
            }),
        }
    }
}

/// Managed callback that will be invoked exactly once
pub struct Continuation {
    id: InvocationId,
    func: Function,
}

impl Continuation {
    pub fn new(id: InvocationId, func: Function) -> Self {
        Self { id, func }
    }

    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Invoke the callback and release it. Returns the callback's own
    /// return value.
    pub fn call(self, args: &[Value]) -> Value {
        self.func.call(args)
    }
}

/// Settlement side of a promise
///
/// Dropping a `Deferred` without settling it rejects the promise, so a
/// promise handed to managed code never stays pending forever.
pub struct Deferred {
    id: InvocationId,
    state: Option<Rc<std::cell::RefCell<PromiseState>>>,
}

impl Promise {
    /// Create a pending promise and the `Deferred` that settles it
    pub fn deferred(id: InvocationId) -> (Deferred, Promise) {
        let promise = Promise::pending();
        let deferred = Deferred {
            id,
            state: Some(Rc::clone(&promise.state)),
        };
        (deferred, promise)
    }
}

impl Deferred {
    pub fn id(&self) -> InvocationId {
        self.id
    }

    pub fn resolve(mut self, value: Value) {
        self.settle(PromiseState::Fulfilled(value));
    }

    pub fn reject(mut self, reason: Value) {
        self.settle(PromiseState::Rejected(reason));
    }

    fn settle(&mut self, outcome: PromiseState) {
        if let Some(state) = self.state.take() {
            let mut slot = state.borrow_mut();
            if matches!(*slot, PromiseState::Pending) {
                *slot = outcome;
            }
        }
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        if self.state.is_some() {
            kwarn!("{}: deferred dropped without settlement", self.id);
            self.settle(PromiseState::Rejected(Value::Error("deferred dropped".into())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_continuation_called_once() {
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let func = Function::new(move |args| {
            c.set(c.get() + 1);
            args.first().cloned().unwrap_or(Value::Undefined)
        });

        let cont = Continuation::new(InvocationId::next(), func);
        let ret = cont.call(&[Value::from("done")]);

        assert_eq!(ret, Value::from("done"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_deferred_resolve_and_reject() {
        let (d, p) = Promise::deferred(InvocationId::next());
        assert!(p.is_pending());
        d.resolve(Value::Int(5));
        assert_eq!(p.settled(), Some(Ok(Value::Int(5))));

        let (d, p) = Promise::deferred(InvocationId::next());
        d.reject(Value::Error("nope".into()));
        assert_eq!(p.settled(), Some(Err(Value::Error("nope".into()))));
    }

    #[test]
    fn test_dropped_deferred_rejects() {
        let (d, p) = Promise::deferred(InvocationId::next());
        drop(d);
        assert!(matches!(p.state(), PromiseState::Rejected(_)));
    }

    #[test]
    fn test_reference_requires_function() {
        let r = Reference::new(Value::Int(3));
        assert!(r.into_continuation(InvocationId::next()).is_err());

        let r = Reference::new(Value::Function(Function::new(|_| Value::Null)));
        assert!(r.into_continuation(InvocationId::next()).is_ok());
    }
}
