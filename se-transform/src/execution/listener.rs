//! Invocation listeners and the call recorder.
//!
//! Every task invocation notifies the listener installed on the current
//! thread. Normal runs have none installed. Graph inference installs a
//! [`CallRecorder`] for the duration of its dry run.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Observer of task invocations.
pub trait InvocationListener: Send + Sync {
    /// Called once per task invocation, before the first attempt.
    fn task_invoked(&self, qualified_name: &str);
}

/// A listener that ignores every invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpListener;

impl InvocationListener for NoOpListener {
    fn task_invoked(&self, _qualified_name: &str) {}
}

/// Ordered buffer of invoked task names.
///
/// Recording only happens between [`begin`](Self::begin) and
/// [`end`](Self::end); the buffer survives `end` so it can be read.
#[derive(Debug, Default)]
pub struct CallRecorder {
    enabled: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl CallRecorder {
    /// Creates a disabled, empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the buffer and starts recording.
    pub fn begin(&self) {
        self.calls.lock().clear();
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Stops recording. The buffer is kept.
    pub fn end(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Appends a name if recording is enabled.
    pub fn record(&self, name: &str) {
        if self.is_enabled() {
            trace!(task = name, "Recorded task call");
            self.calls.lock().push(name.to_string());
        }
    }

    /// Returns whether recording is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Returns the recorded names in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl InvocationListener for CallRecorder {
    fn task_invoked(&self, qualified_name: &str) {
        self.record(qualified_name);
    }
}

thread_local! {
    static LISTENER: RefCell<Option<Arc<dyn InvocationListener>>> = const { RefCell::new(None) };
}

/// Installs a listener on the current thread until the guard is dropped.
pub fn install_listener(listener: Arc<dyn InvocationListener>) -> ListenerGuard {
    let previous = LISTENER.with(|slot| slot.borrow_mut().replace(listener));
    ListenerGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Notifies the current thread's listener, if any.
pub fn notify_task_invoked(qualified_name: &str) {
    let listener = LISTENER.with(|slot| slot.borrow().clone());
    if let Some(listener) = listener {
        listener.task_invoked(qualified_name);
    }
}

/// Restores the previously installed listener when dropped.
#[must_use = "the listener is uninstalled as soon as the guard is dropped"]
pub struct ListenerGuard {
    previous: Option<Arc<dyn InvocationListener>>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        LISTENER.with(|slot| *slot.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    #[test]
    fn test_recorder_only_records_when_enabled() {
        let recorder = CallRecorder::new();
        recorder.record("ignored");
        assert!(recorder.calls().is_empty());

        recorder.begin();
        recorder.record("a");
        recorder.record("b");
        recorder.end();
        recorder.record("late");

        assert!(!recorder.is_enabled());
        assert_eq!(recorder.calls(), vec!["a", "b"]);
    }

    #[test]
    fn test_begin_clears_buffer() {
        let recorder = CallRecorder::new();
        recorder.begin();
        recorder.record("a");
        recorder.end();
        recorder.begin();
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_notify_reaches_installed_listener() {
        let recorder = Arc::new(CallRecorder::new());
        recorder.begin();
        {
            let _guard = install_listener(recorder.clone());
            notify_task_invoked("jobs.extract");
        }
        notify_task_invoked("jobs.after_guard");
        assert_eq!(recorder.calls(), vec!["jobs.extract"]);
    }

    #[test]
    fn test_nested_guards_restore_outer_listener() {
        let outer = Arc::new(CallRecorder::new());
        let inner = Arc::new(CallRecorder::new());
        outer.begin();
        inner.begin();

        let _outer_guard = install_listener(outer.clone());
        {
            let _inner_guard = install_listener(inner.clone());
            notify_task_invoked("inner");
        }
        notify_task_invoked("outer");

        assert_eq!(inner.calls(), vec!["inner"]);
        assert_eq!(outer.calls(), vec!["outer"]);
    }

    #[test]
    fn test_listeners_are_thread_local() {
        let recorder = Arc::new(CallRecorder::new());
        recorder.begin();
        let _guard = install_listener(recorder.clone());

        thread::spawn(|| notify_task_invoked("other_thread"))
            .join()
            .unwrap();
        notify_task_invoked("this_thread");

        assert_eq!(recorder.calls(), vec!["this_thread"]);
    }

    #[test]
    fn test_noop_listener() {
        let _guard = install_listener(Arc::new(NoOpListener));
        notify_task_invoked("anything");
    }
}
