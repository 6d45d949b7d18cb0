//! HTTP lineage sink posting batches to the backend API.

use super::{LineageEvent, LineageSink};
use crate::config::SdkConfig;
use crate::errors::LineageError;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Request timeout for lineage delivery.
pub const LINEAGE_TIMEOUT: Duration = Duration::from_secs(20);

const EVENTS_PATH: &str = "/lineage/events";

#[derive(Serialize)]
struct EventBatch<'a> {
    events: &'a [LineageEvent],
}

/// Posts `{"events": [...]}` to `<api_url>/lineage/events/` with bearer auth.
///
/// Without both an API URL and a token the sink is a silent no-op.
#[derive(Debug, Clone)]
pub struct HttpLineageSink {
    api_url: Option<String>,
    token: Option<String>,
    local_run_id: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpLineageSink {
    /// Creates a sink for an API base URL and token.
    #[must_use]
    pub fn new(api_url: Option<String>, token: Option<String>) -> Self {
        Self {
            api_url,
            token,
            local_run_id: None,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Creates a sink from SDK configuration, including the local correlation id.
    #[must_use]
    pub fn from_config(config: &SdkConfig) -> Self {
        let sink = Self::new(config.api_url.clone(), config.token.clone());
        match &config.local_run_id {
            Some(id) => sink.with_local_run_id(id.clone()),
            None => sink,
        }
    }

    /// Sets the local correlation id stamped into every outgoing event.
    #[must_use]
    pub fn with_local_run_id(mut self, id: impl Into<String>) -> Self {
        self.local_run_id = Some(id.into());
        self
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.client = client;
        self
    }

    /// Returns true when both an endpoint and a credential are configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_url.as_deref().is_some_and(|u| !u.is_empty())
            && self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Resolves the events endpoint for a base URL.
    ///
    /// A URL that already points at the events collection is used without
    /// its trailing slash.
    #[must_use]
    pub fn events_url(base: &str) -> String {
        let trimmed = base.trim_end_matches('/');
        if trimmed.ends_with(EVENTS_PATH) {
            trimmed.to_string()
        } else {
            format!("{trimmed}{EVENTS_PATH}/")
        }
    }
}

impl LineageSink for HttpLineageSink {
    fn emit(&self, mut events: Vec<LineageEvent>) -> Result<(), LineageError> {
        let (Some(api_url), Some(token)) = (self.api_url.as_deref(), self.token.as_deref()) else {
            debug!(count = events.len(), "Lineage sink not configured, dropping events");
            return Ok(());
        };
        if api_url.is_empty() || token.is_empty() || events.is_empty() {
            return Ok(());
        }

        if let Some(local_id) = &self.local_run_id {
            for event in &mut events {
                event.stamp_local_run_id(local_id);
            }
        }

        let url = Self::events_url(api_url);
        debug!(url = %url, count = events.len(), "Posting lineage events");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .timeout(LINEAGE_TIMEOUT)
            .json(&EventBatch { events: &events })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LineageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::JobRef;
    use serde_json::Map;

    fn events() -> Vec<LineageEvent> {
        vec![LineageEvent::start(
            JobRef::new("se://dev/local/repo", "daily"),
            "run-1",
            Map::new(),
        )]
    }

    #[test]
    fn test_events_url_normalization() {
        assert_eq!(
            HttpLineageSink::events_url("https://api.example.com"),
            "https://api.example.com/lineage/events/"
        );
        assert_eq!(
            HttpLineageSink::events_url("https://api.example.com/"),
            "https://api.example.com/lineage/events/"
        );
        assert_eq!(
            HttpLineageSink::events_url("https://api.example.com/lineage/events"),
            "https://api.example.com/lineage/events"
        );
        assert_eq!(
            HttpLineageSink::events_url("https://api.example.com/lineage/events/"),
            "https://api.example.com/lineage/events"
        );
    }

    #[test]
    fn test_unconfigured_sink_is_noop() {
        // An unroutable endpoint would fail if a request were attempted.
        let missing_token = HttpLineageSink::new(Some("http://127.0.0.1:9".to_string()), None);
        assert!(!missing_token.is_configured());
        assert!(missing_token.emit(events()).is_ok());

        let missing_url = HttpLineageSink::new(None, Some("token".to_string()));
        assert!(missing_url.emit(events()).is_ok());

        let from_default = HttpLineageSink::from_config(&SdkConfig::default());
        assert!(from_default.emit(events()).is_ok());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let sink = HttpLineageSink::new(
            Some("http://127.0.0.1:9".to_string()),
            Some("token".to_string()),
        );
        assert!(sink.is_configured());
        assert!(sink.emit(Vec::new()).is_ok());
    }

    #[test]
    fn test_transport_failure_surfaces() {
        let sink = HttpLineageSink::new(
            Some("http://127.0.0.1:9".to_string()),
            Some("token".to_string()),
        );
        assert!(matches!(sink.emit(events()), Err(LineageError::Transport(_))));
    }
}
