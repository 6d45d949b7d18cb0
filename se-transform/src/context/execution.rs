//! The run-scoped execution context.

use crate::config::{job_namespace, SdkConfig};
use crate::errors::LineageError;
use crate::lineage::{sink_from_config, LineageEvent, LineageSink};
use crate::params::Params;
use crate::storage::{storage_from_config, Storage};
use crate::utils::generate_run_id;
use std::fmt;
use std::sync::Arc;

/// Identity and collaborators of one pipeline run.
///
/// Every task invoked during a run observes the same context through
/// [`get_context`](super::get_context).
#[derive(Clone)]
pub struct RunContext {
    run_id: String,
    params: Params,
    tenant: String,
    repo: String,
    run_url: String,
    storage: Arc<dyn Storage>,
    sink: Arc<dyn LineageSink>,
}

impl RunContext {
    /// Creates a context with a fresh run id and default attribution.
    #[must_use]
    pub fn new(params: Params, storage: Arc<dyn Storage>, sink: Arc<dyn LineageSink>) -> Self {
        let defaults = SdkConfig::default();
        Self {
            run_id: generate_run_id(),
            params,
            tenant: defaults.tenant,
            repo: defaults.repo,
            run_url: defaults.run_url,
            storage,
            sink,
        }
    }

    /// Creates a context attributed and wired from configuration.
    #[must_use]
    pub fn from_config(config: &SdkConfig, params: Params) -> Self {
        Self::new(params, storage_from_config(config), sink_from_config(config))
            .with_tenant(config.tenant.clone())
            .with_repo(config.repo.clone())
            .with_run_url(config.run_url.clone())
    }

    /// Creates the context used when no run is active.
    ///
    /// It carries a fresh run id, no params, and attribution, storage and
    /// lineage sink taken from the process environment.
    #[must_use]
    pub fn unattributed() -> Self {
        Self::from_config(&SdkConfig::from_env(), Params::new())
    }

    /// Overrides the run id.
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Sets the tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    /// Sets the repository identifier.
    #[must_use]
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    /// Sets the external run link.
    #[must_use]
    pub fn with_run_url(mut self, run_url: impl Into<String>) -> Self {
        self.run_url = run_url.into();
        self
    }

    /// Replaces the storage handle.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Replaces the lineage sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LineageSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Returns the invocation parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the tenant.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Returns the repository identifier.
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Returns the external run link.
    #[must_use]
    pub fn run_url(&self) -> &str {
        &self.run_url
    }

    /// Returns the storage handle.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Returns the lineage sink.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn LineageSink> {
        &self.sink
    }

    /// Lineage job namespace for this run.
    #[must_use]
    pub fn job_namespace(&self) -> String {
        job_namespace(&self.tenant, &self.repo)
    }

    /// Emits a single lineage event through the run's sink.
    pub fn emit(&self, event: LineageEvent) -> Result<(), LineageError> {
        self.sink.emit(vec![event])
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("params", &self.params)
            .field("tenant", &self.tenant)
            .field("repo", &self.repo)
            .field("run_url", &self.run_url)
            .field("storage", &self.storage.backend_name())
            .finish_non_exhaustive()
    }
}
