//! Run id generation.

use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Generates a new run id in its hyphenated string form.
#[must_use]
pub fn generate_run_id() -> String {
    generate_uuid().to_string()
}
