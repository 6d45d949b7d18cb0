//! Repository manifest of registered pipelines.
//!
//! The manifest lists every pipeline in a registry together with its dry-run
//! task graph, and is what gets registered with the backend.

mod client;

pub use client::{ManifestClient, REGISTER_PATH, REGISTER_TIMEOUT};

use crate::config::SdkConfig;
use crate::errors::SdkError;
use crate::execution::{GraphInference, PipelineGraph};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Stable pipeline id: `se://<repo>::<module>:<function>`.
#[must_use]
pub fn pipeline_id(repo: &str, qualified_name: &str) -> String {
    format!("se://{repo}::{qualified_name}")
}

/// One pipeline in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Stable pipeline id.
    pub id: String,
    /// Pipeline name.
    pub name: String,
    /// `<module>:<function>`.
    pub entrypoint: String,
    /// Declared parameter names, in declaration order.
    pub params: Vec<String>,
    /// Declaring module.
    pub module: String,
    /// Inferred task graph.
    pub graph: PipelineGraph,
}

/// Manifest of a repository's pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Repository identifier.
    pub repo: String,
    /// Commit the manifest was built from.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Pipelines in registration order.
    pub pipelines: Vec<ManifestEntry>,
}

impl Manifest {
    /// Builds a manifest from a registry, inferring graphs with default rules.
    #[must_use]
    pub fn discover(registry: &Registry, config: &SdkConfig) -> Self {
        Self::discover_with(registry, config, &GraphInference::new(registry.clone()))
    }

    /// Builds a manifest using a configured inference engine.
    #[must_use]
    pub fn discover_with(registry: &Registry, config: &SdkConfig, inference: &GraphInference) -> Self {
        let pipelines: Vec<ManifestEntry> = registry
            .pipelines()
            .iter()
            .map(|spec| {
                let entrypoint = spec.qualified_name();
                ManifestEntry {
                    id: pipeline_id(&config.repo, &entrypoint),
                    name: spec.name.clone(),
                    params: spec.param_names(),
                    module: spec.module.clone(),
                    graph: inference.infer(spec),
                    entrypoint,
                }
            })
            .collect();

        info!(repo = %config.repo, pipelines = pipelines.len(), "Discovered pipelines");
        Self {
            repo: config.repo.clone(),
            git_ref: config.git_ref.clone(),
            pipelines,
        }
    }

    /// Fails with [`SdkError::NoPipelines`] if the manifest is empty.
    pub fn require_pipelines(self) -> Result<Self, SdkError> {
        if self.pipelines.is_empty() {
            Err(SdkError::NoPipelines)
        } else {
            Ok(self)
        }
    }

    /// Looks up an entry by pipeline name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ManifestEntry> {
        self.pipelines.iter().find(|p| p.name == name)
    }

    /// Renders the manifest as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, SdkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a manifest from JSON.
    pub fn from_json(input: &str) -> Result<Self, SdkError> {
        Ok(serde_json::from_str(input)?)
    }
}
