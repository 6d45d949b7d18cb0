//! Environment-derived SDK configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under a local root directory.
    #[default]
    Local,
    /// An S3-compatible object store.
    S3,
}

impl StorageBackend {
    /// Parses a backend name; anything other than `s3` selects the local backend.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("s3") {
            Self::S3
        } else {
            Self::Local
        }
    }
}

/// Configuration shared by the runner, lineage sink, manifest client and
/// storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Backend API base URL (lineage and manifest endpoints).
    #[serde(default)]
    pub api_url: Option<String>,
    /// Bearer token for the backend API.
    #[serde(default)]
    pub token: Option<String>,
    /// Tenant used in job namespaces.
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Repository identifier (`owner/name`).
    #[serde(default = "default_repo")]
    pub repo: String,
    /// Link to the external CI run.
    #[serde(default)]
    pub run_url: String,
    /// Source revision reported in manifests.
    #[serde(default)]
    pub git_ref: String,
    /// Local correlation id stamped into outgoing lineage events.
    #[serde(default)]
    pub local_run_id: Option<String>,
    /// Storage backend selection.
    #[serde(default)]
    pub storage_backend: StorageBackend,
    /// Root directory of the local storage backend.
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    /// Object store region.
    #[serde(default)]
    pub region: Option<String>,
    /// Object store endpoint override.
    #[serde(default)]
    pub s3_endpoint_url: Option<String>,
}

fn default_tenant() -> String {
    "dev".to_string()
}

fn default_repo() -> String {
    "local/repo".to_string()
}

fn default_local_root() -> PathBuf {
    PathBuf::from("./local_s3")
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            token: None,
            tenant: default_tenant(),
            repo: default_repo(),
            run_url: String::new(),
            git_ref: String::new(),
            local_run_id: None,
            storage_backend: StorageBackend::Local,
            local_root: default_local_root(),
            region: None,
            s3_endpoint_url: None,
        }
    }
}

impl SdkConfig {
    /// Creates a configuration with defaults and nothing read from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the configuration from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            api_url: get("SE_API_URL"),
            token: get("SE_TOKEN"),
            tenant: get("SE_TENANT").unwrap_or(defaults.tenant),
            repo: get("GITHUB_REPOSITORY").unwrap_or(defaults.repo),
            run_url: get("GITHUB_RUN_URL").unwrap_or_default(),
            git_ref: get("GITHUB_SHA").unwrap_or_default(),
            local_run_id: get("LOCAL_RUN_ID"),
            storage_backend: get("SE_STORAGE_BACKEND")
                .map_or(StorageBackend::Local, |v| StorageBackend::parse(&v)),
            local_root: get("SE_LOCAL_S3_ROOT").map_or(defaults.local_root, PathBuf::from),
            region: get("AWS_REGION"),
            s3_endpoint_url: get("SE_S3_ENDPOINT_URL"),
        }
    }

    /// Sets the backend API URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
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
    pub fn with_run_url(mut self, url: impl Into<String>) -> Self {
        self.run_url = url.into();
        self
    }

    /// Sets the source revision.
    #[must_use]
    pub fn with_git_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = git_ref.into();
        self
    }

    /// Sets the local correlation id.
    #[must_use]
    pub fn with_local_run_id(mut self, id: impl Into<String>) -> Self {
        self.local_run_id = Some(id.into());
        self
    }

    /// Sets the storage backend.
    #[must_use]
    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.storage_backend = backend;
        self
    }

    /// Sets the local storage root.
    #[must_use]
    pub fn with_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = root.into();
        self
    }

    /// Sets the object store region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the object store endpoint.
    #[must_use]
    pub fn with_s3_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.s3_endpoint_url = Some(url.into());
        self
    }

    /// Job namespace for lineage events: `se://<tenant>/<repo>`.
    #[must_use]
    pub fn job_namespace(&self) -> String {
        job_namespace(&self.tenant, &self.repo)
    }
}

/// Builds the lineage job namespace for a tenant and repository.
#[must_use]
pub fn job_namespace(tenant: &str, repo: &str) -> String {
    format!("se://{tenant}/{repo}")
}
