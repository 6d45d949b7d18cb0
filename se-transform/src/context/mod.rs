//! Run context management.
//!
//! Each thread carries at most one ambient [`RunContext`]. The pipeline
//! runner installs one for the duration of a run; task code reads it with
//! [`get_context`]. A thread that never had a context installed receives a
//! fresh unattributed one on first access.

mod ambient;
#[cfg(test)]
mod context_tests;
mod execution;

pub use ambient::{
    clear_context, enter, get_context, set_context, try_get_context, with_context, ContextGuard,
};
pub use execution::RunContext;
