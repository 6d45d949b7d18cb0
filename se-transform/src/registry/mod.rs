//! Process-wide registry of declared tasks and pipelines.
//!
//! Registration returns an opaque handle into an arena. Tasks are keyed by
//! function identity (`<module>.<function>`) and pipelines by name; both are
//! append/replace-only. Registering the same key again replaces the stored
//! descriptor in place and returns the same handle, so repeated declaration
//! never duplicates entries.

mod spec;

pub use spec::{ParamKind, PipelineFn, PipelineSpec, TaskSpec};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Handle to a registered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(usize);

/// Handle to a registered pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PipelineId(usize);

#[derive(Default)]
struct RegistryInner {
    tasks: Vec<Arc<TaskSpec>>,
    tasks_by_fn: HashMap<String, TaskId>,
    pipelines: Vec<Arc<PipelineSpec>>,
    pipelines_by_name: IndexMap<String, PipelineId>,
}

/// Registry of task and pipeline descriptors.
///
/// Cloning a registry yields another handle to the same storage.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<RegistryInner>>,
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

impl Registry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Registers a task, replacing any task with the same function identity.
    pub fn register_task(&self, spec: TaskSpec) -> TaskId {
        let key = spec.qualified_name();
        let mut inner = self.inner.write();

        if let Some(&id) = inner.tasks_by_fn.get(&key) {
            inner.tasks[id.0] = Arc::new(spec);
            debug!(task = %key, "Replaced task registration");
            return id;
        }

        let id = TaskId(inner.tasks.len());
        inner.tasks.push(Arc::new(spec));
        inner.tasks_by_fn.insert(key.clone(), id);
        debug!(task = %key, "Registered task");
        id
    }

    /// Registers a pipeline, replacing any pipeline with the same name.
    ///
    /// A replaced pipeline keeps its position in [`Registry::pipelines`].
    pub fn register_pipeline(&self, spec: PipelineSpec) -> PipelineId {
        let name = spec.name.clone();
        let mut inner = self.inner.write();

        if let Some(&id) = inner.pipelines_by_name.get(&name) {
            debug!(
                pipeline = %name,
                previous = %inner.pipelines[id.0].qualified_name(),
                replacement = %spec.qualified_name(),
                "Replaced pipeline registration"
            );
            inner.pipelines[id.0] = Arc::new(spec);
            return id;
        }

        let id = PipelineId(inner.pipelines.len());
        inner.pipelines.push(Arc::new(spec));
        inner.pipelines_by_name.insert(name.clone(), id);
        debug!(pipeline = %name, "Registered pipeline");
        id
    }

    /// Looks up a task by handle.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<Arc<TaskSpec>> {
        self.inner.read().tasks.get(id.0).cloned()
    }

    /// Looks up a task by function identity (`<module>.<function>`).
    #[must_use]
    pub fn task_by_qualified_name(&self, qualified_name: &str) -> Option<(TaskId, Arc<TaskSpec>)> {
        let inner = self.inner.read();
        inner
            .tasks_by_fn
            .get(qualified_name)
            .map(|&id| (id, inner.tasks[id.0].clone()))
    }

    /// Looks up a pipeline by handle.
    #[must_use]
    pub fn pipeline(&self, id: PipelineId) -> Option<Arc<PipelineSpec>> {
        self.inner.read().pipelines.get(id.0).cloned()
    }

    /// Looks up a pipeline by name.
    #[must_use]
    pub fn pipeline_by_name(&self, name: &str) -> Option<Arc<PipelineSpec>> {
        let inner = self.inner.read();
        inner
            .pipelines_by_name
            .get(name)
            .map(|&id| inner.pipelines[id.0].clone())
    }

    /// Looks up the first pipeline whose entrypoint is `<module>:<function>`.
    #[must_use]
    pub fn pipeline_by_qualified_name(&self, qualified_name: &str) -> Option<Arc<PipelineSpec>> {
        self.pipelines()
            .into_iter()
            .find(|p| p.qualified_name() == qualified_name)
    }

    /// Returns all pipelines in registration order.
    #[must_use]
    pub fn pipelines(&self) -> Vec<Arc<PipelineSpec>> {
        let inner = self.inner.read();
        inner
            .pipelines_by_name
            .values()
            .map(|&id| inner.pipelines[id.0].clone())
            .collect()
    }

    /// Returns all tasks in registration order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Arc<TaskSpec>> {
        self.inner.read().tasks.clone()
    }

    /// Returns the number of registered tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.inner.read().tasks.len()
    }

    /// Returns the number of registered pipelines.
    #[must_use]
    pub fn pipeline_count(&self) -> usize {
        self.inner.read().pipelines.len()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Registry")
            .field("tasks", &inner.tasks_by_fn.keys().collect::<Vec<_>>())
            .field("pipelines", &inner.pipelines_by_name.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pipeline(name: &str, module: &str) -> PipelineSpec {
        PipelineSpec::new(name, module, "run", |_| Ok(serde_json::Value::Null))
    }

    #[test]
    fn test_register_task_returns_stable_handle() {
        let registry = Registry::new();
        let first = registry.register_task(TaskSpec::new("jobs.a", "extract"));
        let again = registry.register_task(TaskSpec::new("jobs.a", "extract").with_retries(4));

        assert_eq!(first, again);
        assert_eq!(registry.task_count(), 1);
        assert_eq!(registry.task(first).unwrap().retries, 4);
    }

    #[test]
    fn test_tasks_keyed_by_function_not_name() {
        let registry = Registry::new();
        let a = registry.register_task(TaskSpec::new("jobs.a", "load").with_name("load"));
        let b = registry.register_task(TaskSpec::new("jobs.b", "load").with_name("load"));

        assert_ne!(a, b);
        assert_eq!(registry.task_count(), 2);
        let (id, spec) = registry.task_by_qualified_name("jobs.b.load").unwrap();
        assert_eq!(id, b);
        assert_eq!(spec.module, "jobs.b");
    }

    #[test]
    fn test_pipeline_name_collision_last_wins() {
        let registry = Registry::new();
        registry.register_pipeline(pipeline("daily", "jobs.a"));
        registry.register_pipeline(pipeline("weekly", "jobs.a"));
        registry.register_pipeline(pipeline("daily", "jobs.b"));

        assert_eq!(registry.pipeline_count(), 2);
        assert_eq!(registry.pipeline_by_name("daily").unwrap().module, "jobs.b");

        let names: Vec<String> = registry.pipelines().iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["daily".to_string(), "weekly".to_string()]);
    }

    #[test]
    fn test_pipeline_by_qualified_name() {
        let registry = Registry::new();
        let id = registry.register_pipeline(pipeline("daily", "jobs.a"));

        assert_eq!(registry.pipeline(id).unwrap().name, "daily");
        assert!(registry.pipeline_by_qualified_name("jobs.a:run").is_some());
        assert!(registry.pipeline_by_qualified_name("jobs.b:run").is_none());
    }

    #[test]
    fn test_clones_share_storage() {
        let registry = Registry::new();
        let handle = registry.clone();
        handle.register_task(TaskSpec::new("jobs.a", "extract"));

        assert_eq!(registry.task_count(), 1);
        assert!(format!("{registry:?}").contains("jobs.a.extract"));
    }
}
