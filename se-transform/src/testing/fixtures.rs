//! Test fixtures wiring an isolated registry, sink and storage.

use super::mocks::MemoryStorage;
use crate::config::SdkConfig;
use crate::context::RunContext;
use crate::execution::{GraphInference, Pipeline, Runner, Task};
use crate::lineage::{CollectingLineageSink, LineageEvent};
use crate::params::Params;
use crate::registry::{PipelineSpec, Registry, TaskSpec};
use std::sync::Arc;

/// Tenant used by [`TestHarness`].
pub const TEST_TENANT: &str = "test";

/// Repository used by [`TestHarness`].
pub const TEST_REPO: &str = "acme/etl";

/// An isolated registry with collecting lineage and in-memory storage.
#[derive(Debug, Clone)]
pub struct TestHarness {
    /// Private registry.
    pub registry: Registry,
    /// Sink every run of this harness reports to.
    pub sink: Arc<CollectingLineageSink>,
    /// Storage visible to tasks.
    pub storage: Arc<MemoryStorage>,
    /// Configuration used for attribution.
    pub config: SdkConfig,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Creates a harness attributed to [`TEST_TENANT`] and [`TEST_REPO`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            sink: Arc::new(CollectingLineageSink::new()),
            storage: Arc::new(MemoryStorage::new()),
            config: SdkConfig::new().with_tenant(TEST_TENANT).with_repo(TEST_REPO),
        }
    }

    /// Returns a runner bound to this harness.
    #[must_use]
    pub fn runner(&self) -> Runner {
        Runner::new(self.config.clone())
            .with_registry(self.registry.clone())
            .with_sink(self.sink.clone())
            .with_storage(self.storage.clone())
    }

    /// Returns a context bound to this harness, for invoking tasks outside a run.
    #[must_use]
    pub fn context(&self, params: Params) -> RunContext {
        self.runner().new_context(params)
    }

    /// Returns a graph inference engine bound to this harness.
    #[must_use]
    pub fn inference(&self) -> GraphInference {
        GraphInference::new(self.registry.clone()).with_storage(self.storage.clone())
    }

    /// Registers a task in the private registry.
    pub fn task<A, T, F>(&self, spec: TaskSpec, func: F) -> Task<A, T>
    where
        A: Clone,
        F: Fn(A) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Task::register(&self.registry, spec, func)
    }

    /// Registers a pipeline in the private registry.
    pub fn pipeline(&self, spec: PipelineSpec) -> Pipeline {
        Pipeline::register(&self.registry, spec)
    }

    /// Returns every event collected so far.
    #[must_use]
    pub fn events(&self) -> Vec<LineageEvent> {
        self.sink.events()
    }
}
