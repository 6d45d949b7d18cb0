//! Lineage reporting.
//!
//! This module provides the lineage event model and the sinks events are
//! delivered to.

mod event;
mod http;
mod sink;

pub use event::{
    source_code_location, CompleteEvent, ErrorFacet, EventCore, EventType, JobRef,
    LineageDataset, LineageEvent, RunInfo, ERROR_FACET, LOCAL_RUN_ID_FACET, PRODUCER,
    SOURCE_CODE_LOCATION_FACET,
};
pub use http::{HttpLineageSink, LINEAGE_TIMEOUT};
pub use sink::{CollectingLineageSink, LineageSink, LoggingLineageSink, NoOpLineageSink};

#[cfg(test)]
pub use sink::MockLineageSink;

use crate::config::SdkConfig;
use std::sync::Arc;

/// Builds the lineage sink described by the configuration.
///
/// The HTTP sink is returned even when no endpoint is configured; it then
/// drops events silently.
#[must_use]
pub fn sink_from_config(config: &SdkConfig) -> Arc<dyn LineageSink> {
    Arc::new(HttpLineageSink::from_config(config))
}
