//! Lineage event model.
//!
//! Events follow a fixed schema:
//!
//! ```json
//! {
//!   "eventType": "COMPLETE",
//!   "eventTime": "2025-10-01T08:00:00Z",
//!   "producer": "https://se-transform/sdk/0.1.0",
//!   "job": {"namespace": "se://dev/acme/etl", "name": "pipelines.daily.extract"},
//!   "run": {"runId": "…", "facets": {}},
//!   "inputs": [{"namespace": "s3://lake", "name": "raw/date={ds}/events.jsonl"}],
//!   "outputs": []
//! }
//! ```

use crate::datasets::DatasetRef;
use crate::utils::event_time;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Producer identifier stamped on every event.
pub const PRODUCER: &str = concat!("https://se-transform/sdk/", env!("CARGO_PKG_VERSION"));

/// Run facet key carrying the local correlation id.
pub const LOCAL_RUN_ID_FACET: &str = "se_local_run_id";

/// Run facet key carrying failure details.
pub const ERROR_FACET: &str = "errorMessage";

/// Run facet key carrying the source repository of a pipeline run.
pub const SOURCE_CODE_LOCATION_FACET: &str = "sourceCodeLocation";

/// Identity of the job an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRef {
    /// Job namespace (`se://<tenant>/<repo>`).
    pub namespace: String,
    /// Job name.
    pub name: String,
}

impl JobRef {
    /// Creates a job reference.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Dataset projection carried by `COMPLETE` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageDataset {
    /// Dataset namespace.
    pub namespace: String,
    /// Dataset name.
    pub name: String,
}

impl From<&DatasetRef> for LineageDataset {
    fn from(r: &DatasetRef) -> Self {
        Self {
            namespace: r.namespace.clone(),
            name: r.name.clone(),
        }
    }
}

/// Run identity and facets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    /// Pipeline run id shared by every event of one run.
    pub run_id: String,
    /// Free-form run facets.
    #[serde(default)]
    pub facets: Map<String, Value>,
}

/// Fields shared by every event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCore {
    /// UTC time the event was built (`%Y-%m-%dT%H:%M:%SZ`).
    pub event_time: String,
    /// Producer identifier.
    pub producer: String,
    /// Job the event is about.
    pub job: JobRef,
    /// Run the event belongs to.
    pub run: RunInfo,
}

impl EventCore {
    fn new(job: JobRef, run_id: String, facets: Map<String, Value>) -> Self {
        Self {
            event_time: event_time(),
            producer: PRODUCER.to_string(),
            job,
            run: RunInfo { run_id, facets },
        }
    }
}

/// Body of a `COMPLETE` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteEvent {
    /// Shared fields.
    #[serde(flatten)]
    pub core: EventCore,
    /// Declared input datasets.
    #[serde(default)]
    pub inputs: Vec<LineageDataset>,
    /// Declared output datasets.
    #[serde(default)]
    pub outputs: Vec<LineageDataset>,
}

/// Failure details stored in the `errorMessage` run facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFacet {
    /// One-line error message.
    pub message: String,
    /// Rendered error chain/backtrace, at most 5000 characters.
    pub stack: String,
}

impl ErrorFacet {
    /// Builds the facet from a failure, truncating the stack.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        let (message, stack) = crate::errors::render_failure(err);
        Self { message, stack }
    }
}

/// Discriminant of a [`LineageEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Job started.
    Start,
    /// Job completed.
    Complete,
    /// Job failed.
    Fail,
}

impl EventType {
    /// Wire name of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Complete => "COMPLETE",
            Self::Fail => "FAIL",
        }
    }
}

/// A lineage event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "UPPERCASE")]
pub enum LineageEvent {
    /// Job started.
    Start(EventCore),
    /// Job completed.
    Complete(CompleteEvent),
    /// Job failed; details live in the `errorMessage` run facet.
    Fail(EventCore),
}

impl LineageEvent {
    /// Builds a `START` event.
    #[must_use]
    pub fn start(job: JobRef, run_id: impl Into<String>, facets: Map<String, Value>) -> Self {
        Self::Start(EventCore::new(job, run_id.into(), facets))
    }

    /// Builds a `COMPLETE` event with dataset lineage.
    #[must_use]
    pub fn complete(
        job: JobRef,
        run_id: impl Into<String>,
        inputs: Vec<LineageDataset>,
        outputs: Vec<LineageDataset>,
    ) -> Self {
        Self::Complete(CompleteEvent {
            core: EventCore::new(job, run_id.into(), Map::new()),
            inputs,
            outputs,
        })
    }

    /// Builds a `FAIL` event carrying an `errorMessage` facet.
    #[must_use]
    pub fn fail(job: JobRef, run_id: impl Into<String>, error: &ErrorFacet) -> Self {
        let mut facets = Map::new();
        facets.insert(
            ERROR_FACET.to_string(),
            json!({ "message": error.message, "stack": error.stack }),
        );
        Self::Fail(EventCore::new(job, run_id.into(), facets))
    }

    /// Returns the event type.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Start(_) => EventType::Start,
            Self::Complete(_) => EventType::Complete,
            Self::Fail(_) => EventType::Fail,
        }
    }

    /// Returns the shared fields.
    #[must_use]
    pub const fn core(&self) -> &EventCore {
        match self {
            Self::Start(core) | Self::Fail(core) => core,
            Self::Complete(event) => &event.core,
        }
    }

    fn core_mut(&mut self) -> &mut EventCore {
        match self {
            Self::Start(core) | Self::Fail(core) => core,
            Self::Complete(event) => &mut event.core,
        }
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.core().run.run_id
    }

    /// Returns the job reference.
    #[must_use]
    pub fn job(&self) -> &JobRef {
        &self.core().job
    }

    /// Returns the run facets.
    #[must_use]
    pub fn facets(&self) -> &Map<String, Value> {
        &self.core().run.facets
    }

    /// Decodes the `errorMessage` facet, if present.
    #[must_use]
    pub fn error_facet(&self) -> Option<ErrorFacet> {
        self.facets()
            .get(ERROR_FACET)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Stamps the local correlation id into the run facets.
    ///
    /// This is the only mutation applied to an event after construction and
    /// happens right before the event is sent.
    pub fn stamp_local_run_id(&mut self, local_run_id: &str) {
        self.core_mut().run.facets.insert(
            LOCAL_RUN_ID_FACET.to_string(),
            json!({ "localRunId": local_run_id }),
        );
    }
}

/// Builds the `sourceCodeLocation` facet map attached to pipeline `START` events.
#[must_use]
pub fn source_code_location(repo: &str) -> Map<String, Value> {
    let mut facets = Map::new();
    facets.insert(
        SOURCE_CODE_LOCATION_FACET.to_string(),
        json!({ "git": { "repoUrl": repo } }),
    );
    facets
}
