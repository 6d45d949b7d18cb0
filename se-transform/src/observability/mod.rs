//! Observability utilities.
//!
//! Logging goes through `tracing`. [`init_tracing`] installs a formatting
//! subscriber for binaries and notebooks that do not configure their own.

mod subscriber;
mod timer;

pub use subscriber::{init_tracing, LogFormat, DEFAULT_FILTER};
pub use timer::SpanTimer;
