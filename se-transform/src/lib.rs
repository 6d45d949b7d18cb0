//! # SE Transform
//!
//! A task and pipeline execution engine with lineage reporting.
//!
//! Pipelines are ordinary functions composed of tasks. The engine provides:
//!
//! - **Registry**: process-wide store of declared tasks and pipelines
//! - **Run context**: run identity, params and storage visible to every task
//! - **Retrying task invocation**: immediate retries with one lineage
//!   start/complete/fail pair per invocation
//! - **Graph inference**: task order reconstructed from a dry run
//! - **Lineage**: OpenLineage-shaped events delivered over HTTP
//! - **Storage**: local-directory and S3-compatible object backends
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use se_transform::prelude::*;
//!
//! let raw = S3Dataset::new("lake", "raw/date={ds}/events.jsonl");
//!
//! let extract: Task<(), usize> = Task::declare(
//!     TaskSpec::new(module_path!(), "extract").with_output(&raw).with_retries(2),
//!     |()| {
//!         let ctx = get_context();
//!         let ds = ctx.params().get_str("ds")?;
//!         Ok(ctx.storage().read_records("lake", &format!("raw/date={ds}/events.jsonl"))?.len())
//!     },
//! );
//!
//! let daily = Pipeline::declare(
//!     PipelineSpec::new("daily", module_path!(), "daily", move |_| {
//!         Ok(serde_json::json!({ "rows": extract.call(())? }))
//!     })
//!     .with_param("ds", ParamKind::Date),
//! );
//!
//! let result = daily.run(Params::new().with("ds", "2025-10-01"))?;
//! let graph = daily.infer_graph()?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod datasets;
pub mod errors;
pub mod execution;
pub mod lineage;
pub mod manifest;
pub mod observability;
pub mod params;
pub mod registry;
pub mod storage;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{SdkConfig, StorageBackend};
    pub use crate::context::{get_context, with_context, RunContext};
    pub use crate::datasets::{Dataset, DatasetRef, S3Dataset};
    pub use crate::errors::{SdkError, StorageError};
    pub use crate::execution::{
        GraphInference, GraphInferenceConfig, Pipeline, PipelineGraph, Runner, Task,
    };
    pub use crate::lineage::{LineageEvent, LineageSink};
    pub use crate::manifest::{Manifest, ManifestClient};
    pub use crate::params::Params;
    pub use crate::registry::{ParamKind, PipelineSpec, Registry, TaskSpec};
    pub use crate::storage::Storage;
}
