//! Dry-run graph inference.
//!
//! A pipeline's task graph is reconstructed by running the pipeline once with
//! placeholder parameters while a [`CallRecorder`] observes which tasks fire.
//! Edges connect consecutive calls, so the graph reflects observed order, not
//! data dependency.

use super::listener::{install_listener, CallRecorder};
use crate::config::SdkConfig;
use crate::context::RunContext;
use crate::lineage::{LineageSink, NoOpLineageSink};
use crate::params::Params;
use crate::registry::{PipelineSpec, Registry};
use crate::storage::{storage_from_config, Storage};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default name of the date parameter alias.
pub const DEFAULT_DATE_ALIAS: &str = "ds";

/// Default placeholder for date-like parameters.
pub const DEFAULT_SENTINEL_DATE: &str = "2025-01-01";

/// Placeholder rules for dry runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInferenceConfig {
    /// Parameter name treated as a date even though it does not contain `date`.
    pub date_alias: String,
    /// Value given to date-like parameters.
    pub sentinel_date: String,
}

impl Default for GraphInferenceConfig {
    fn default() -> Self {
        Self {
            date_alias: DEFAULT_DATE_ALIAS.to_string(),
            sentinel_date: DEFAULT_SENTINEL_DATE.to_string(),
        }
    }
}

impl GraphInferenceConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the date alias.
    #[must_use]
    pub fn with_date_alias(mut self, alias: impl Into<String>) -> Self {
        self.date_alias = alias.into();
        self
    }

    /// Sets the sentinel date.
    #[must_use]
    pub fn with_sentinel_date(mut self, date: impl Into<String>) -> Self {
        self.sentinel_date = date.into();
        self
    }

    /// Returns true if `name` should receive the sentinel date.
    #[must_use]
    pub fn is_date_param(&self, name: &str) -> bool {
        name == self.date_alias || name.to_lowercase().contains("date")
    }
}

/// Builds placeholder parameters for a dry run.
///
/// Date-like parameters get the sentinel date, everything else an empty
/// string.
#[must_use]
pub fn synthesize_params<'a>(
    names: impl IntoIterator<Item = &'a str>,
    config: &GraphInferenceConfig,
) -> Params {
    names
        .into_iter()
        .map(|name| {
            let value = if config.is_date_param(name) {
                config.sentinel_date.clone()
            } else {
                String::new()
            };
            (name.to_string(), serde_json::Value::String(value))
        })
        .collect()
}

/// A task observed during a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Function identity of the task.
    pub id: String,
    /// Display name.
    pub label: String,
}

/// An observed ordering between two task calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Earlier call.
    pub from: String,
    /// Next call.
    pub to: String,
}

/// The inferred task graph of a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineGraph {
    /// Distinct tasks in first-seen order.
    pub nodes: Vec<GraphNode>,
    /// One edge per consecutive pair of calls, duplicates included.
    pub edges: Vec<GraphEdge>,
    /// Nodes without incoming edges.
    pub entry: Vec<String>,
    /// Nodes without outgoing edges.
    pub terminal: Vec<String>,
}

impl PipelineGraph {
    /// Builds a graph from a raw call sequence.
    pub fn from_calls<L>(calls: &[String], label: L) -> Self
    where
        L: Fn(&str) -> String,
    {
        let ids: IndexSet<&str> = calls.iter().map(String::as_str).collect();
        let edges: Vec<GraphEdge> = calls
            .windows(2)
            .map(|pair| GraphEdge {
                from: pair[0].clone(),
                to: pair[1].clone(),
            })
            .collect();

        let has_incoming: HashSet<&str> = edges.iter().map(|e| e.to.as_str()).collect();
        let has_outgoing: HashSet<&str> = edges.iter().map(|e| e.from.as_str()).collect();

        Self {
            nodes: ids
                .iter()
                .map(|id| GraphNode {
                    id: (*id).to_string(),
                    label: label(*id),
                })
                .collect(),
            entry: ids
                .iter()
                .filter(|id| !has_incoming.contains(*id))
                .map(|id| (*id).to_string())
                .collect(),
            terminal: ids
                .iter()
                .filter(|id| !has_outgoing.contains(*id))
                .map(|id| (*id).to_string())
                .collect(),
            edges,
        }
    }

    /// Returns true when no task was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns node ids in first-seen order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Returns edges as `(from, to)` pairs.
    #[must_use]
    pub fn edge_pairs(&self) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect()
    }
}

/// Infers pipeline graphs by dry run.
#[derive(Clone)]
pub struct GraphInference {
    registry: Registry,
    config: GraphInferenceConfig,
    storage: Option<Arc<dyn Storage>>,
    sink: Option<Arc<dyn LineageSink>>,
}

impl GraphInference {
    /// Creates an inference engine resolving labels through `registry`.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            config: GraphInferenceConfig::default(),
            storage: None,
            sink: None,
        }
    }

    /// Sets the placeholder rules.
    #[must_use]
    pub fn with_config(mut self, config: GraphInferenceConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the storage visible to tasks during the dry run.
    ///
    /// Without one, the configured backend is used.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the sink receiving the task events emitted during the dry run.
    ///
    /// Without one, dry-run lineage is discarded.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LineageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns the placeholder rules.
    #[must_use]
    pub const fn config(&self) -> &GraphInferenceConfig {
        &self.config
    }

    /// Dry-runs the pipeline and returns the observed graph.
    ///
    /// Errors and panics raised by the pipeline are absorbed; the graph then
    /// holds whatever was recorded before the failure. Lineage goes to the
    /// sink set with [`GraphInference::with_sink`], if any.
    pub fn infer(&self, spec: &PipelineSpec) -> PipelineGraph {
        let sdk_config = SdkConfig::from_env();
        let params = synthesize_params(spec.params.keys().map(String::as_str), &self.config);
        let storage = self
            .storage
            .clone()
            .unwrap_or_else(|| storage_from_config(&sdk_config));
        let sink: Arc<dyn LineageSink> = match &self.sink {
            Some(sink) => sink.clone(),
            None => Arc::new(NoOpLineageSink),
        };
        let ctx = RunContext::new(params.clone(), storage, sink)
            .with_tenant(sdk_config.tenant)
            .with_repo(sdk_config.repo);

        let recorder = Arc::new(CallRecorder::new());
        recorder.begin();
        let outcome = {
            let _ctx_guard = ctx.enter();
            let _listener_guard = install_listener(recorder.clone());
            panic::catch_unwind(AssertUnwindSafe(|| spec.invoke(&params)))
        };
        recorder.end();

        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(
                pipeline = %spec.name,
                error = %format!("{err:#}"),
                "Dry run failed, graph is partial"
            ),
            Err(_) => warn!(pipeline = %spec.name, "Dry run panicked, graph is partial"),
        }

        let calls = recorder.calls();
        debug!(pipeline = %spec.name, calls = calls.len(), "Inferred pipeline graph");
        PipelineGraph::from_calls(&calls, |id| self.label(id))
    }

    fn label(&self, id: &str) -> String {
        self.registry
            .task_by_qualified_name(id)
            .map_or_else(|| id.to_string(), |(_, spec)| spec.name.clone())
    }
}

impl fmt::Debug for GraphInference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphInference")
            .field("config", &self.config)
            .field("storage", &self.storage.as_ref().map(|s| s.backend_name()))
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}
