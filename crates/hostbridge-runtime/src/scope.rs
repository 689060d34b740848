//! Handle scope guard
//!
//! Managed code may only be invoked while a scope is open. Scopes nest;
//! the depth is tracked on the runtime and restored on drop.

use crate::runtime::Env;

pub struct HandleScope<'a> {
    env: &'a Env,
}

impl<'a> HandleScope<'a> {
    pub(crate) fn enter(env: &'a Env) -> Self {
        let depth = &env.inner.scope_depth;
        depth.set(depth.get() + 1);
        Self { env }
    }

    pub fn env(&self) -> &'a Env {
        self.env
    }

    /// Number of scopes currently open, this one included
    pub fn depth(&self) -> usize {
        self.env.inner.scope_depth.get()
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        let depth = &self.env.inner.scope_depth;
        depth.set(depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::pool::InlinePool;
    use crate::runtime::Runtime;

    #[test]
    fn test_scopes_nest_and_unwind() {
        let rt = Runtime::with_pool(RuntimeConfig::new(), Box::new(InlinePool::new())).unwrap();
        let env = rt.env();
        let outer = env.open_handle_scope().unwrap();
        assert_eq!(outer.depth(), 1);
        {
            let inner = env.open_handle_scope().unwrap();
            assert_eq!(inner.depth(), 2);
        }
        assert_eq!(outer.depth(), 1);
        drop(outer);
        assert_eq!(env.open_handle_scope().unwrap().depth(), 1);
    }
}
