//! Utility functions for run id generation and lineage timestamps.

pub mod timestamps;
mod uuid_utils;

pub use timestamps::{event_time, format_event_time, Timestamp};
pub use uuid_utils::{generate_run_id, generate_uuid};
