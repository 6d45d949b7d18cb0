//! Per-thread ambient context slot.

use super::RunContext;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static CURRENT: RefCell<Option<Arc<RunContext>>> = const { RefCell::new(None) };
}

/// Replaces the current thread's ambient context.
pub fn set_context(ctx: RunContext) {
    CURRENT.with(|slot| *slot.borrow_mut() = Some(Arc::new(ctx)));
}

/// Returns the current thread's ambient context.
///
/// If none was ever installed on this thread, an unattributed context is
/// built from the environment, installed, and returned.
pub fn get_context() -> Arc<RunContext> {
    if let Some(ctx) = try_get_context() {
        return ctx;
    }
    let ctx = Arc::new(RunContext::unattributed());
    CURRENT.with(|slot| slot.borrow_mut().get_or_insert_with(|| ctx.clone()).clone())
}

/// Returns the current thread's ambient context without creating one.
pub fn try_get_context() -> Option<Arc<RunContext>> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Removes the current thread's ambient context.
pub fn clear_context() {
    CURRENT.with(|slot| *slot.borrow_mut() = None);
}

/// Installs a context for the current thread until the guard is dropped,
/// then restores whatever was installed before.
pub fn enter(ctx: RunContext) -> ContextGuard {
    let previous = CURRENT.with(|slot| slot.borrow_mut().replace(Arc::new(ctx)));
    ContextGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Runs `f` with `ctx` installed as the ambient context.
pub fn with_context<R>(ctx: RunContext, f: impl FnOnce() -> R) -> R {
    let _guard = enter(ctx);
    f()
}

/// Restores the previous ambient context when dropped.
///
/// The guard is tied to the thread that created it.
#[must_use = "the context is uninstalled as soon as the guard is dropped"]
pub struct ContextGuard {
    previous: Option<Arc<RunContext>>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|slot| *slot.borrow_mut() = previous);
    }
}

impl RunContext {
    /// Installs this context for the current thread until the guard drops.
    pub fn enter(self) -> ContextGuard {
        enter(self)
    }
}
