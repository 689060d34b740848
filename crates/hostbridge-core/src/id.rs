//! Invocation identifiers
//!
//! Every bridge invocation gets an `InvocationId`. Worker threads carry the
//! id (never the continuation) and the runtime thread uses it to find the
//! continuation it holds.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier for one in-flight invocation (async work, thread-safe
/// function, async handle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InvocationId(u64);

impl InvocationId {
    pub const NONE: Self = Self(0);

    /// Allocate a fresh, process-unique id
    #[inline]
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inv#{}", self.0)
    }
}
