//! Pipeline handles.

use super::graph::{GraphInference, PipelineGraph};
use super::runner::Runner;
use crate::errors::SdkError;
use crate::params::Params;
use crate::registry::{PipelineId, PipelineSpec, Registry};
use serde_json::Value;
use std::sync::Arc;

/// A registered pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    id: PipelineId,
    registry: Registry,
}

impl Pipeline {
    /// Registers `spec` in `registry`.
    pub fn register(registry: &Registry, spec: PipelineSpec) -> Self {
        Self {
            id: registry.register_pipeline(spec),
            registry: registry.clone(),
        }
    }

    /// Registers `spec` in the process-wide registry.
    pub fn declare(spec: PipelineSpec) -> Self {
        Self::register(Registry::global(), spec)
    }

    /// Returns the registry handle.
    #[must_use]
    pub const fn id(&self) -> PipelineId {
        self.id
    }

    /// Returns the current descriptor.
    pub fn spec(&self) -> Result<Arc<PipelineSpec>, SdkError> {
        self.registry
            .pipeline(self.id)
            .ok_or_else(|| SdkError::PipelineNotFound(format!("{:?}", self.id)))
    }

    /// Runs the pipeline with a runner built from the environment.
    pub fn run(&self, params: Params) -> Result<Value, SdkError> {
        self.run_with(&Runner::from_env().with_registry(self.registry.clone()), params)
    }

    /// Runs the pipeline with the given runner.
    pub fn run_with(&self, runner: &Runner, params: Params) -> Result<Value, SdkError> {
        let spec = self.spec()?;
        runner.run(&spec, params)
    }

    /// Infers the task graph with default placeholder rules.
    pub fn infer_graph(&self) -> Result<PipelineGraph, SdkError> {
        let spec = self.spec()?;
        Ok(GraphInference::new(self.registry.clone()).infer(&spec))
    }
}
