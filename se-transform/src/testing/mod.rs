//! Testing utilities for pipelines and tasks.
//!
//! This module provides:
//! - Flaky task bodies and in-memory storage
//! - Lineage event assertions
//! - An isolated test harness

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_event_sequence, assert_failed_with, assert_single_run, count_events};
pub use fixtures::{TestHarness, TEST_REPO, TEST_TENANT};
pub use mocks::{FlakyFn, MemoryStorage};
