//! Manifest registration client.

use super::Manifest;
use crate::config::SdkConfig;
use crate::errors::SdkError;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Path appended to the API base URL.
pub const REGISTER_PATH: &str = "/pipelines/register";

/// Request timeout for registration.
pub const REGISTER_TIMEOUT: Duration = Duration::from_secs(20);

/// Registers manifests with the backend API.
#[derive(Debug, Clone)]
pub struct ManifestClient {
    api_url: Option<String>,
    token: Option<String>,
    client: reqwest::blocking::Client,
}

impl ManifestClient {
    /// Creates a client for an API base URL and token.
    #[must_use]
    pub fn new(api_url: Option<String>, token: Option<String>) -> Self {
        Self {
            api_url,
            token,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Creates a client from SDK configuration.
    #[must_use]
    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(config.api_url.clone(), config.token.clone())
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::blocking::Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the registration endpoint, if an API URL is configured.
    #[must_use]
    pub fn register_url(&self) -> Option<String> {
        self.api_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| format!("{}{REGISTER_PATH}", url.trim_end_matches('/')))
    }

    /// Registers a manifest and returns the backend's JSON response.
    pub fn register(&self, manifest: &Manifest) -> Result<Value, SdkError> {
        self.register_value(&serde_json::to_value(manifest)?)
    }

    /// Registers an already-serialized manifest.
    pub fn register_value(&self, manifest: &Value) -> Result<Value, SdkError> {
        let url = self
            .register_url()
            .ok_or_else(|| SdkError::Config("SE_API_URL is not set".to_string()))?;

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_deref().unwrap_or_default())
            .timeout(REGISTER_TIMEOUT)
            .json(manifest)
            .send()
            .map_err(|e| SdkError::Manifest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SdkError::Manifest(format!("HTTP {}: {body}", status.as_u16())));
        }
        let body = response
            .json::<Value>()
            .map_err(|e| SdkError::Manifest(e.to_string()))?;
        info!(url = %url, "Registered manifest");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_url() {
        let client = ManifestClient::new(Some("https://api.example.com/".to_string()), None);
        assert_eq!(
            client.register_url().as_deref(),
            Some("https://api.example.com/pipelines/register")
        );
        assert!(ManifestClient::new(Some(String::new()), None).register_url().is_none());
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let client = ManifestClient::from_config(&SdkConfig::default());
        let err = client.register_value(&json!({"pipelines": []})).unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn test_transport_failure_is_manifest_error() {
        let client = ManifestClient::new(
            Some("http://127.0.0.1:9".to_string()),
            Some("token".to_string()),
        );
        let err = client.register_value(&json!({"pipelines": []})).unwrap_err();
        assert!(matches!(err, SdkError::Manifest(_)));
    }
}
