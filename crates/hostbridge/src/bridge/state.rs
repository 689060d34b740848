//! Bridge counter
//!
//! The thread-safe and event-loop bridges pass the counter to the callback
//! and store the callback's integer result back into it. It lives on the
//! runtime thread and is only touched by marshaling code running there.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Default, Debug)]
pub struct Counter(Rc<Cell<i32>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> i32 {
        self.0.get()
    }

    pub fn set(&self, value: i32) {
        self.0.set(value);
    }

    pub fn reset(&self) {
        self.0.set(0);
    }
}
