//! Task and pipeline execution.
//!
//! - [`invoke_task`] wraps a task body with retries and lineage
//! - [`Runner`] executes a pipeline under a fresh run context
//! - [`GraphInference`] reconstructs a pipeline's task order from a dry run
//! - [`InvocationListener`] lets callers observe task invocations

mod graph;
mod listener;
mod pipeline;
mod runner;
mod task;

pub use graph::{
    synthesize_params, GraphEdge, GraphInference, GraphInferenceConfig, GraphNode, PipelineGraph,
    DEFAULT_DATE_ALIAS, DEFAULT_SENTINEL_DATE,
};
pub use listener::{
    install_listener, notify_task_invoked, CallRecorder, InvocationListener, ListenerGuard,
    NoOpListener,
};
pub use pipeline::Pipeline;
pub use runner::Runner;
pub use task::{invoke_task, Task};
