//! Lineage sink trait and in-process implementations.

use super::{EventType, LineageEvent};
use crate::errors::LineageError;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

/// Receives batches of lineage events.
///
/// Emission is synchronous. Transport failures are returned to the caller;
/// sinks that are not configured should return `Ok(())` without doing work.
#[cfg_attr(test, mockall::automock)]
pub trait LineageSink: Send + Sync {
    /// Delivers a batch of events.
    fn emit(&self, events: Vec<LineageEvent>) -> Result<(), LineageError>;
}

/// A sink that discards all events.
///
/// Used for dry runs and wherever lineage is not wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLineageSink;

impl LineageSink for NoOpLineageSink {
    fn emit(&self, _events: Vec<LineageEvent>) -> Result<(), LineageError> {
        Ok(())
    }
}

/// A sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingLineageSink {
    level: Level,
}

impl Default for LoggingLineageSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingLineageSink {
    /// Creates a new logging sink with the specified level.
    #[must_use]
    pub const fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &LineageEvent) {
        let event_type = event.event_type().as_str();
        let job = &event.job().name;
        let run_id = event.run_id();
        if self.level == Level::DEBUG {
            debug!(event_type, job = %job, run_id, "Lineage event");
        } else {
            info!(event_type, job = %job, run_id, "Lineage event");
        }
    }
}

impl LineageSink for LoggingLineageSink {
    fn emit(&self, events: Vec<LineageEvent>) -> Result<(), LineageError> {
        for event in &events {
            self.log_event(event);
        }
        Ok(())
    }
}

/// A sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingLineageSink {
    events: RwLock<Vec<LineageEvent>>,
}

impl CollectingLineageSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<LineageEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events of one type.
    #[must_use]
    pub fn events_of_type(&self, event_type: EventType) -> Vec<LineageEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .cloned()
            .collect()
    }

    /// Returns events about one job.
    #[must_use]
    pub fn events_for_job(&self, job_name: &str) -> Vec<LineageEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.job().name == job_name)
            .cloned()
            .collect()
    }

    /// Returns `(event type, job name)` pairs in emission order.
    #[must_use]
    pub fn timeline(&self) -> Vec<(EventType, String)> {
        self.events
            .read()
            .iter()
            .map(|e| (e.event_type(), e.job().name.clone()))
            .collect()
    }
}

impl LineageSink for CollectingLineageSink {
    fn emit(&self, events: Vec<LineageEvent>) -> Result<(), LineageError> {
        self.events.write().extend(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::JobRef;
    use serde_json::Map;

    fn event(kind: EventType, job: &str) -> LineageEvent {
        let job = JobRef::new("se://dev/local/repo", job);
        match kind {
            EventType::Start => LineageEvent::start(job, "run-1", Map::new()),
            EventType::Complete => LineageEvent::complete(job, "run-1", vec![], vec![]),
            EventType::Fail => LineageEvent::fail(
                job,
                "run-1",
                &crate::lineage::ErrorFacet::from_error(&anyhow::anyhow!("boom")),
            ),
        }
    }

    #[test]
    fn test_noop_sink() {
        let sink = NoOpLineageSink;
        assert!(sink.emit(vec![event(EventType::Start, "a")]).is_ok());
    }

    #[test]
    fn test_logging_sink() {
        let sink = LoggingLineageSink::default();
        assert!(sink.emit(vec![event(EventType::Start, "a"), event(EventType::Fail, "a")]).is_ok());
        assert!(LoggingLineageSink::debug().emit(vec![]).is_ok());
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingLineageSink::new();
        assert!(sink.is_empty());

        sink.emit(vec![event(EventType::Start, "a")]).unwrap();
        sink.emit(vec![event(EventType::Complete, "a"), event(EventType::Start, "b")])
            .unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type(EventType::Start).len(), 2);
        assert_eq!(sink.events_for_job("a").len(), 2);
        assert_eq!(
            sink.timeline(),
            vec![
                (EventType::Start, "a".to_string()),
                (EventType::Complete, "a".to_string()),
                (EventType::Start, "b".to_string()),
            ]
        );

        sink.clear();
        assert!(sink.is_empty());
    }
}
