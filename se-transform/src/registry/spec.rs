//! Task and pipeline descriptors.

use super::TaskId;
use crate::datasets::{Dataset, DatasetRef};
use crate::params::Params;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Declared shape of a pipeline parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// Free-form string.
    #[default]
    String,
    /// Calendar date string (`YYYY-MM-DD`).
    Date,
    /// Integer.
    Integer,
    /// Floating point number.
    Float,
    /// Boolean flag.
    Boolean,
    /// Arbitrary JSON.
    Json,
}

/// Metadata describing a declared task.
///
/// A task's identity is its function: `module` plus `function`. Two tasks may
/// share a user-facing `name` as long as they are different functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// User-facing task name (defaults to the function name).
    pub name: String,
    /// Module path of the declaring function.
    pub module: String,
    /// Declaring function name.
    pub function: String,
    /// Datasets the task reads, for lineage.
    pub inputs: Vec<DatasetRef>,
    /// Datasets the task writes, for lineage.
    pub outputs: Vec<DatasetRef>,
    /// Additional attempts after the first failure.
    pub retries: u32,
    /// Declared timeout in seconds. Not enforced by the engine.
    pub timeout_s: Option<u64>,
}

impl TaskSpec {
    /// Creates a task spec for `module::function`, usually called with
    /// `module_path!()`.
    #[must_use]
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        let function = function.into();
        Self {
            name: function.clone(),
            module: module.into(),
            function,
            inputs: Vec::new(),
            outputs: Vec::new(),
            retries: 0,
            timeout_s: None,
        }
    }

    /// Overrides the user-facing name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declares an input dataset.
    #[must_use]
    pub fn with_input(mut self, dataset: &impl Dataset) -> Self {
        self.inputs.push(dataset.dataset_ref());
        self
    }

    /// Declares an output dataset.
    #[must_use]
    pub fn with_output(mut self, dataset: &impl Dataset) -> Self {
        self.outputs.push(dataset.dataset_ref());
        self
    }

    /// Sets the number of additional attempts.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the declared timeout.
    #[must_use]
    pub fn with_timeout_s(mut self, timeout_s: u64) -> Self {
        self.timeout_s = Some(timeout_s);
        self
    }

    /// Function identity and lineage job name: `<module>.<function>`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.function)
    }

    /// Total number of attempts the wrapper will make.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Signature of a pipeline body.
pub type PipelineFn = dyn Fn(&Params) -> anyhow::Result<serde_json::Value> + Send + Sync;

/// Metadata and body of a declared pipeline.
#[derive(Clone)]
pub struct PipelineSpec {
    /// User-facing pipeline name.
    pub name: String,
    /// Module path of the declaring function.
    pub module: String,
    /// Declaring function name.
    pub function: String,
    /// Declared parameters, in declaration order.
    pub params: IndexMap<String, ParamKind>,
    /// Tasks explicitly attached to the pipeline, by task name.
    pub tasks: IndexMap<String, TaskId>,
    func: Arc<PipelineFn>,
}

impl PipelineSpec {
    /// Creates a pipeline spec around a body.
    pub fn new<F>(
        name: impl Into<String>,
        module: impl Into<String>,
        function: impl Into<String>,
        func: F,
    ) -> Self
    where
        F: Fn(&Params) -> anyhow::Result<serde_json::Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            module: module.into(),
            function: function.into(),
            params: IndexMap::new(),
            tasks: IndexMap::new(),
            func: Arc::new(func),
        }
    }

    /// Declares a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.insert(name.into(), kind);
        self
    }

    /// Attaches a task handle under a task name.
    #[must_use]
    pub fn with_task(mut self, name: impl Into<String>, task: TaskId) -> Self {
        self.tasks.insert(name.into(), task);
        self
    }

    /// Entrypoint identity: `<module>:<function>`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.module, self.function)
    }

    /// Declared parameter names, in declaration order.
    #[must_use]
    pub fn param_names(&self) -> Vec<String> {
        self.params.keys().cloned().collect()
    }

    /// Calls the pipeline body directly, without context or lineage.
    pub fn invoke(&self, params: &Params) -> anyhow::Result<serde_json::Value> {
        (self.func)(params)
    }
}

impl fmt::Debug for PipelineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineSpec")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("function", &self.function)
            .field("params", &self.params)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::S3Dataset;

    #[test]
    fn test_task_spec_defaults() {
        let spec = TaskSpec::new("pipelines.daily", "extract");

        assert_eq!(spec.name, "extract");
        assert_eq!(spec.qualified_name(), "pipelines.daily.extract");
        assert_eq!(spec.retries, 0);
        assert_eq!(spec.max_attempts(), 1);
        assert!(spec.timeout_s.is_none());
    }

    #[test]
    fn test_task_spec_builder() {
        let raw = S3Dataset::new("lake", "raw/date={ds}/events.jsonl");
        let curated = S3Dataset::new("lake", "curated/date={ds}/events.jsonl");
        let spec = TaskSpec::new("pipelines.daily", "clean")
            .with_name("clean_events")
            .with_input(&raw)
            .with_output(&curated)
            .with_retries(2)
            .with_timeout_s(600);

        assert_eq!(spec.name, "clean_events");
        assert_eq!(spec.inputs[0].name, "raw/date={ds}/events.jsonl");
        assert_eq!(spec.outputs[0].namespace, "s3://lake");
        assert_eq!(spec.max_attempts(), 3);
        assert_eq!(spec.timeout_s, Some(600));
    }

    #[test]
    fn test_pipeline_spec_invoke() {
        let spec = PipelineSpec::new("daily", "pipelines.daily", "run", |params| {
            Ok(serde_json::json!({ "ds": params.get_str("ds")? }))
        })
        .with_param("ds", ParamKind::Date)
        .with_param("limit", ParamKind::Integer);

        assert_eq!(spec.qualified_name(), "pipelines.daily:run");
        assert_eq!(spec.param_names(), vec!["ds".to_string(), "limit".to_string()]);

        let out = spec.invoke(&Params::new().with("ds", "2025-10-01")).unwrap();
        assert_eq!(out["ds"], "2025-10-01");
        assert!(format!("{spec:?}").contains("daily"));
    }
}
