//! Error types for the se-transform SDK.
//!
//! User-supplied task and pipeline bodies return [`anyhow::Result`]; the SDK
//! wraps their failures in [`SdkError`] without discarding the original error,
//! which stays reachable through [`std::error::Error::source`].

use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

/// Maximum number of characters of a rendered error kept in a lineage
/// `errorMessage` facet.
pub const MAX_STACK_CHARS: usize = 5000;

/// The main error type for SDK operations.
#[derive(Debug, Error)]
pub enum SdkError {
    /// A task failed on every allowed attempt.
    #[error("task '{task}' failed after {attempts} attempt(s)")]
    TaskFailed {
        /// The task's job name.
        task: String,
        /// Number of attempts made (retries + 1).
        attempts: u32,
        /// The error returned by the last attempt.
        #[source]
        source: anyhow::Error,
    },

    /// A pipeline function returned an error.
    #[error("pipeline '{pipeline}' failed")]
    PipelineFailed {
        /// The pipeline name.
        pipeline: String,
        /// The error returned by the pipeline body.
        #[source]
        source: anyhow::Error,
    },

    /// A task handle does not resolve in the registry it was bound to.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// No pipeline is registered under the requested name or entrypoint.
    #[error("pipeline not found: {0}")]
    PipelineNotFound(String),

    /// Discovery produced an empty manifest where pipelines were required.
    #[error("no pipelines discovered")]
    NoPipelines,

    /// Lineage emission failed.
    #[error(transparent)]
    Lineage(#[from] LineageError),

    /// A storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A dataset descriptor could not be rendered.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Manifest registration failed.
    #[error("manifest registration failed: {0}")]
    Manifest(String),

    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SdkError {
    /// Returns the error a failed task or pipeline body produced, if any.
    #[must_use]
    pub fn user_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::TaskFailed { source, .. } | Self::PipelineFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        let kind = match self {
            Self::TaskFailed { task, attempts, .. } => {
                map.insert("task".to_string(), json!(task));
                map.insert("attempts".to_string(), json!(attempts));
                "TaskFailed"
            }
            Self::PipelineFailed { pipeline, .. } => {
                map.insert("pipeline".to_string(), json!(pipeline));
                "PipelineFailed"
            }
            Self::TaskNotFound(name) => {
                map.insert("name".to_string(), json!(name));
                "TaskNotFound"
            }
            Self::PipelineNotFound(name) => {
                map.insert("name".to_string(), json!(name));
                "PipelineNotFound"
            }
            Self::NoPipelines => "NoPipelines",
            Self::Lineage(_) => "Lineage",
            Self::Storage(_) => "Storage",
            Self::Dataset(_) => "Dataset",
            Self::Manifest(_) => "Manifest",
            Self::Config(_) => "Config",
            Self::Serialization(_) => "Serialization",
        };
        map.insert("type".to_string(), json!(kind));
        map.insert("message".to_string(), json!(self.to_string()));
        map
    }
}

/// Errors raised while delivering lineage events.
#[derive(Debug, Error)]
pub enum LineageError {
    /// The HTTP request could not be performed.
    #[error("lineage transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The lineage endpoint answered with a non-success status.
    #[error("lineage endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("object not found: {uri}")]
    NotFound {
        /// The object URI.
        uri: String,
    },

    /// Local filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Object store HTTP transport error.
    #[error("object store transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Object store answered with a non-success status.
    #[error("object store returned {status} for {uri}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The object URI.
        uri: String,
    },

    /// A line of a records file was not valid JSON.
    #[error("invalid record on line {line}: {source}")]
    InvalidRecord {
        /// 1-based line number.
        line: usize,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Stored bytes were not valid UTF-8.
    #[error("object {uri} is not valid UTF-8")]
    Encoding {
        /// The object URI.
        uri: String,
    },

    /// Object store credentials are missing.
    #[error("missing object store credentials: {0}")]
    Credentials(String),
}

/// Errors raised when rendering dataset key templates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// A template placeholder had no matching parameter.
    #[error("missing template parameter '{param}' for key template '{template}'")]
    MissingParam {
        /// The missing parameter name.
        param: String,
        /// The template being rendered.
        template: String,
    },
}

/// Renders an error for a lineage `errorMessage` facet.
///
/// Returns `(message, stack)` where `message` is the error chain on one line
/// and `stack` is the debug rendering (chain plus backtrace when captured),
/// capped at [`MAX_STACK_CHARS`] characters.
#[must_use]
pub fn render_failure(err: &anyhow::Error) -> (String, String) {
    let message = format!("{err:#}");
    let stack = truncate_chars(&format!("{err:?}"), MAX_STACK_CHARS);
    (message, stack)
}

/// Truncates `s` to at most `max` characters on a char boundary.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_task_failed_keeps_source() {
        let err = SdkError::TaskFailed {
            task: "pipelines.extract".to_string(),
            attempts: 3,
            source: anyhow::anyhow!("connection reset"),
        };

        assert_eq!(err.to_string(), "task 'pipelines.extract' failed after 3 attempt(s)");
        assert_eq!(err.source().map(ToString::to_string), Some("connection reset".to_string()));
        assert_eq!(err.user_error().map(ToString::to_string), Some("connection reset".to_string()));
    }

    #[test]
    fn test_to_dict() {
        let err = SdkError::PipelineNotFound("daily".to_string());
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "PipelineNotFound");
        assert_eq!(dict.get("name").unwrap(), "daily");
    }

    #[test]
    fn test_render_failure_truncates_stack() {
        let long = "x".repeat(MAX_STACK_CHARS * 2);
        let err = anyhow::anyhow!(long).context("outer");
        let (message, stack) = render_failure(&err);

        assert!(message.starts_with("outer: "));
        assert_eq!(stack.chars().count(), MAX_STACK_CHARS);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
