//! The retrying task-invocation wrapper.

use super::listener::notify_task_invoked;
use crate::context::get_context;
use crate::errors::SdkError;
use crate::lineage::{ErrorFacet, JobRef, LineageDataset, LineageEvent};
use crate::observability::SpanTimer;
use crate::registry::{Registry, TaskId, TaskSpec};
use serde_json::Map;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Invokes a task body with lineage reporting and retries.
///
/// Emits one `START` event scoped to the ambient run, notifies the current
/// invocation listener, then calls `call` until it succeeds or `retries + 1`
/// attempts have failed. Success emits `COMPLETE` with the declared datasets
/// and returns the value; exhaustion emits `FAIL` and returns
/// [`SdkError::TaskFailed`] wrapping the last error. Retries are immediate and
/// produce no events of their own.
pub fn invoke_task<T, F>(spec: &TaskSpec, mut call: F) -> Result<T, SdkError>
where
    F: FnMut() -> anyhow::Result<T>,
{
    let ctx = get_context();
    let job = JobRef::new(ctx.job_namespace(), spec.qualified_name());

    ctx.emit(LineageEvent::start(job.clone(), ctx.run_id(), Map::new()))?;
    notify_task_invoked(&job.name);

    let timer = SpanTimer::start(job.name.clone());
    let mut retried: u32 = 0;
    loop {
        match call() {
            Ok(value) => {
                let inputs = spec.inputs.iter().map(LineageDataset::from).collect();
                let outputs = spec.outputs.iter().map(LineageDataset::from).collect();
                ctx.emit(LineageEvent::complete(job, ctx.run_id(), inputs, outputs))?;
                debug!(
                    task = %timer.name(),
                    run_id = ctx.run_id(),
                    attempts = retried.saturating_add(1),
                    duration_ms = timer.elapsed_ms(),
                    "Task completed"
                );
                return Ok(value);
            }
            Err(err) => {
                if retried < spec.retries {
                    retried += 1;
                    warn!(
                        task = %timer.name(),
                        run_id = ctx.run_id(),
                        attempt = retried,
                        max_attempts = spec.max_attempts(),
                        error = %format!("{err:#}"),
                        "Task attempt failed, retrying"
                    );
                    continue;
                }

                let attempts = retried.saturating_add(1);
                error!(
                    task = %timer.name(),
                    run_id = ctx.run_id(),
                    attempts,
                    duration_ms = timer.elapsed_ms(),
                    error = %format!("{err:#}"),
                    "Task failed"
                );
                ctx.emit(LineageEvent::fail(
                    job,
                    ctx.run_id(),
                    &ErrorFacet::from_error(&err),
                ))?;
                return Err(SdkError::TaskFailed {
                    task: spec.qualified_name(),
                    attempts,
                    source: err,
                });
            }
        }
    }
}

type TaskFn<A, T> = dyn Fn(A) -> anyhow::Result<T> + Send + Sync;

/// A registered task bound to its body.
///
/// Calling the handle routes the body through [`invoke_task`] using the
/// descriptor currently stored in the registry, so a re-declaration of the
/// same function takes effect for existing handles.
pub struct Task<A, T> {
    id: TaskId,
    registry: Registry,
    func: Arc<TaskFn<A, T>>,
}

impl<A, T> Task<A, T>
where
    A: Clone,
{
    /// Registers `spec` in `registry` and binds it to `func`.
    pub fn register<F>(registry: &Registry, spec: TaskSpec, func: F) -> Self
    where
        F: Fn(A) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            id: registry.register_task(spec),
            registry: registry.clone(),
            func: Arc::new(func),
        }
    }

    /// Registers `spec` in the process-wide registry and binds it to `func`.
    pub fn declare<F>(spec: TaskSpec, func: F) -> Self
    where
        F: Fn(A) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::register(Registry::global(), spec, func)
    }

    /// Returns the registry handle.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the current descriptor.
    pub fn spec(&self) -> Result<Arc<TaskSpec>, SdkError> {
        self.registry
            .task(self.id)
            .ok_or_else(|| SdkError::TaskNotFound(format!("{:?}", self.id)))
    }

    /// Invokes the task with retries and lineage.
    ///
    /// Each attempt receives its own clone of `args`.
    pub fn call(&self, args: A) -> Result<T, SdkError> {
        let spec = self.spec()?;
        invoke_task(&spec, || (self.func)(args.clone()))
    }
}

impl<A, T> Clone for Task<A, T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            registry: self.registry.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<A, T> fmt::Debug for Task<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("spec", &self.registry.task(self.id).map(|s| s.qualified_name()))
            .finish_non_exhaustive()
    }
}
