//! Assertions over collected lineage events.

use crate::lineage::{EventType, LineageEvent};

/// Asserts the exact `(event type, job name)` sequence.
pub fn assert_event_sequence(events: &[LineageEvent], expected: &[(EventType, &str)]) {
    let actual: Vec<(EventType, &str)> = events
        .iter()
        .map(|e| (e.event_type(), e.job().name.as_str()))
        .collect();
    assert_eq!(actual, expected, "Unexpected lineage event sequence");
}

/// Asserts that every event belongs to the same run and returns its id.
pub fn assert_single_run(events: &[LineageEvent]) -> String {
    let Some(first) = events.first() else {
        panic!("Expected lineage events, got none");
    };
    let run_id = first.run_id();
    for event in events {
        assert_eq!(
            event.run_id(),
            run_id,
            "Event for job '{}' has a different run id",
            event.job().name
        );
    }
    run_id.to_string()
}

/// Asserts that a `FAIL` event exists for `job` and its message contains `needle`.
pub fn assert_failed_with(events: &[LineageEvent], job: &str, needle: &str) {
    let facet = events
        .iter()
        .filter(|e| e.event_type() == EventType::Fail && e.job().name == job)
        .find_map(LineageEvent::error_facet);
    match facet {
        Some(facet) => assert!(
            facet.message.contains(needle),
            "FAIL message for '{job}' was '{}', expected it to contain '{needle}'",
            facet.message
        ),
        None => panic!("No FAIL event with an error facet for job '{job}'"),
    }
}

/// Counts events of one type for one job.
#[must_use]
pub fn count_events(events: &[LineageEvent], event_type: EventType, job: &str) -> usize {
    events
        .iter()
        .filter(|e| e.event_type() == event_type && e.job().name == job)
        .count()
}
