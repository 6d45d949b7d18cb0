//! The pipeline runner.

use crate::config::SdkConfig;
use crate::context::RunContext;
use crate::errors::SdkError;
use crate::lineage::{
    sink_from_config, source_code_location, ErrorFacet, JobRef, LineageEvent, LineageSink,
};
use crate::observability::SpanTimer;
use crate::params::Params;
use crate::registry::{PipelineSpec, Registry};
use crate::storage::{storage_from_config, Storage};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// Executes pipelines under a fresh run context with pipeline-level lineage.
#[derive(Clone)]
pub struct Runner {
    config: SdkConfig,
    registry: Registry,
    sink: Arc<dyn LineageSink>,
    storage: Arc<dyn Storage>,
}

impl Runner {
    /// Creates a runner wired from configuration against the global registry.
    #[must_use]
    pub fn new(config: SdkConfig) -> Self {
        Self {
            sink: sink_from_config(&config),
            storage: storage_from_config(&config),
            registry: Registry::global().clone(),
            config,
        }
    }

    /// Creates a runner from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(SdkConfig::from_env())
    }

    /// Uses another registry for name and entrypoint lookups.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the lineage sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LineageSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the storage handle.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Returns the registry used for lookups.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Builds a fresh context for one run.
    #[must_use]
    pub fn new_context(&self, params: Params) -> RunContext {
        RunContext::new(params, self.storage.clone(), self.sink.clone())
            .with_tenant(self.config.tenant.clone())
            .with_repo(self.config.repo.clone())
            .with_run_url(self.config.run_url.clone())
    }

    /// Runs a pipeline.
    ///
    /// The new context is installed on the current thread for the duration
    /// of the call, so every task invoked by the body reports under this
    /// run's id. The previous context is restored afterwards.
    pub fn run(&self, spec: &PipelineSpec, params: Params) -> Result<Value, SdkError> {
        let ctx = self.new_context(params.clone());
        let run_id = ctx.run_id().to_string();
        let job = JobRef::new(ctx.job_namespace(), spec.name.clone());
        let _guard = ctx.enter();

        info!(pipeline = %spec.name, run_id = %run_id, entrypoint = %spec.qualified_name(), "Pipeline run started");
        self.sink.emit(vec![LineageEvent::start(
            job.clone(),
            run_id.clone(),
            source_code_location(&self.config.repo),
        )])?;

        let timer = SpanTimer::start(spec.name.clone());
        match spec.invoke(&params) {
            Ok(value) => {
                self.sink.emit(vec![LineageEvent::complete(
                    job,
                    run_id.clone(),
                    Vec::new(),
                    Vec::new(),
                )])?;
                info!(
                    pipeline = %spec.name,
                    run_id = %run_id,
                    duration_ms = timer.finish(),
                    "Pipeline run completed"
                );
                Ok(value)
            }
            Err(err) => {
                error!(
                    pipeline = %spec.name,
                    run_id = %run_id,
                    duration_ms = timer.finish(),
                    error = %format!("{err:#}"),
                    "Pipeline run failed"
                );
                self.sink.emit(vec![LineageEvent::fail(
                    job,
                    run_id,
                    &ErrorFacet::from_error(&err),
                )])?;
                Err(SdkError::PipelineFailed {
                    pipeline: spec.name.clone(),
                    source: err,
                })
            }
        }
    }

    /// Runs the pipeline registered under `name`.
    pub fn run_by_name(&self, name: &str, params: Params) -> Result<Value, SdkError> {
        let spec = self
            .registry
            .pipeline_by_name(name)
            .ok_or_else(|| SdkError::PipelineNotFound(name.to_string()))?;
        self.run(&spec, params)
    }

    /// Runs the pipeline whose entrypoint is `<module>:<function>`.
    pub fn run_entrypoint(&self, entrypoint: &str, params: Params) -> Result<Value, SdkError> {
        let spec = self
            .registry
            .pipeline_by_qualified_name(entrypoint)
            .ok_or_else(|| SdkError::PipelineNotFound(entrypoint.to_string()))?;
        self.run(&spec, params)
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::from_env()
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("tenant", &self.config.tenant)
            .field("repo", &self.config.repo)
            .field("registry", &self.registry)
            .field("storage", &self.storage.backend_name())
            .finish_non_exhaustive()
    }
}
