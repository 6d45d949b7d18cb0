//! S3-compatible object store backend.
//!
//! Requests use path-style URLs (`<endpoint>/<bucket>/<key>`) and are signed
//! with AWS Signature Version 4.

use super::{Storage, WriteReceipt};
use crate::config::SdkConfig;
use crate::errors::StorageError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, StatusCode, Url};
use sha2::{Digest, Sha256};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_REGION: &str = "us-east-1";
const SERVICE: &str = "s3";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Access credentials for the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
}

impl Credentials {
    /// Creates static credentials.
    #[must_use]
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Sets the session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
    /// `AWS_SESSION_TOKEN`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let get = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let creds = Self::new(get("AWS_ACCESS_KEY_ID")?, get("AWS_SECRET_ACCESS_KEY")?);
        Some(match get("AWS_SESSION_TOKEN") {
            Some(token) => creds.with_session_token(token),
            None => creds,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Object store client.
///
/// Missing credentials are reported when a request is made, not at
/// construction, so a context can always carry a storage handle.
#[derive(Debug, Clone)]
pub struct ObjectStoreStorage {
    endpoint: String,
    region: String,
    credentials: Option<Credentials>,
    client: Client,
}

impl ObjectStoreStorage {
    /// Creates a client for an endpoint and region.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            region: region.into(),
            credentials: None,
            client: Client::new(),
        }
    }

    /// Creates a client from configuration and environment credentials.
    ///
    /// Without an endpoint override the regional AWS endpoint is used.
    #[must_use]
    pub fn from_config(config: &SdkConfig) -> Self {
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = config
            .s3_endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://s3.{region}.amazonaws.com"));
        let storage = Self::new(endpoint, region);
        match Credentials::from_env() {
            Some(creds) => storage.with_credentials(creds),
            None => storage,
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Returns the endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, StorageError> {
        let raw = format!("{}/{}/{}", self.endpoint, bucket, uri_encode(key, false));
        Url::parse(&raw).map_err(|e| StorageError::Credentials(format!("invalid endpoint {raw}: {e}")))
    }

    fn request(
        &self,
        method: Method,
        bucket: &str,
        key: &str,
        body: &[u8],
    ) -> Result<RequestBuilder, StorageError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            StorageError::Credentials("AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY not set".to_string())
        })?;
        let url = self.object_url(bucket, key)?;
        let signed = sign_request(
            method.as_str(),
            &url,
            body,
            credentials,
            &self.region,
            Utc::now(),
        )?;

        let mut builder = self
            .client
            .request(method, url)
            .header("x-amz-date", &signed.amz_date)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("authorization", &signed.authorization);
        if let Some(token) = &credentials.session_token {
            builder = builder.header("x-amz-security-token", token);
        }
        Ok(builder)
    }
}

impl Storage for ObjectStoreStorage {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    fn read_text(&self, bucket: &str, key: &str) -> Result<String, StorageError> {
        let response = self.request(Method::GET, bucket, key, b"")?.send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound {
                uri: self.uri(bucket, key),
            }),
            status if !status.is_success() => Err(StorageError::Status {
                status: status.as_u16(),
                uri: self.uri(bucket, key),
            }),
            _ => {
                let bytes = response.bytes()?;
                String::from_utf8(bytes.to_vec()).map_err(|_| StorageError::Encoding {
                    uri: self.uri(bucket, key),
                })
            }
        }
    }

    fn write_text(&self, bucket: &str, key: &str, data: &str) -> Result<WriteReceipt, StorageError> {
        let response = self
            .request(Method::PUT, bucket, key, data.as_bytes())?
            .body(data.to_string())
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status {
                status: status.as_u16(),
                uri: self.uri(bucket, key),
            });
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();
        debug!(uri = %self.uri(bucket, key), bytes = data.len(), "Wrote object");
        Ok(WriteReceipt {
            etag,
            bytes: data.len(),
        })
    }

    fn exists(&self, bucket: &str, key: &str) -> bool {
        self.request(Method::HEAD, bucket, key, b"")
            .and_then(|req| req.send().map_err(StorageError::from))
            .is_ok_and(|resp| resp.status().is_success())
    }
}

/// Headers produced by request signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignedHeaders {
    pub(crate) amz_date: String,
    pub(crate) payload_hash: String,
    pub(crate) authorization: String,
}

/// Signs a request with AWS Signature Version 4 (no query string).
pub(crate) fn sign_request(
    method: &str,
    url: &Url,
    body: &[u8],
    credentials: &Credentials,
    region: &str,
    now: DateTime<Utc>,
) -> Result<SignedHeaders, StorageError> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();
    let payload_hash = hex::encode(Sha256::digest(body));

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(StorageError::Credentials(format!("endpoint has no host: {url}"))),
    };

    let mut headers = vec![
        ("host", host),
        ("x-amz-content-sha256", payload_hash.clone()),
        ("x-amz-date", amz_date.clone()),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token", token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(b.0));

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{method}\n{}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
        url.path()
    );
    let scope = format!("{date_stamp}/{region}/{SERVICE}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(&credentials.secret_access_key, &date_stamp, region, SERVICE)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        ),
        amz_date,
        payload_hash,
    })
}

/// Derives the SigV4 signing key.
pub(crate) fn signing_key(
    secret: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, StorageError> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StorageError::Credentials(format!("invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Percent-encodes everything except unreserved characters; `/` is kept
/// unless `encode_slash` is set.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(byte));
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn creds() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
    }

    #[test]
    fn test_signing_key_matches_reference_derivation() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_sign_request_shape() {
        let url = Url::parse("http://localhost:9000/lake/raw/date%3D2025/a.jsonl").unwrap();
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        let signed = sign_request("GET", &url, b"", &creds(), "us-east-1", now).unwrap();

        assert_eq!(signed.amz_date, "20251001T120000Z");
        assert_eq!(
            signed.payload_hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20251001/us-east-1/s3/aws4_request, \
             SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature="
        ));

        let again = sign_request("GET", &url, b"", &creds(), "us-east-1", now).unwrap();
        assert_eq!(signed, again);
    }

    #[test]
    fn test_session_token_is_signed() {
        let url = Url::parse("https://s3.us-east-1.amazonaws.com/lake/a").unwrap();
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        let signed = sign_request(
            "PUT",
            &url,
            b"data",
            &creds().with_session_token("tok"),
            "us-east-1",
            now,
        )
        .unwrap();

        assert!(signed
            .authorization
            .contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("raw/date=2025-10-01/a b.jsonl", false), "raw/date%3D2025-10-01/a%20b.jsonl");
        assert_eq!(uri_encode("a/b", true), "a%2Fb");
    }

    #[test]
    fn test_from_config_endpoint() {
        let storage = ObjectStoreStorage::from_config(&SdkConfig::default().with_region("eu-west-1"));
        assert_eq!(storage.endpoint(), "https://s3.eu-west-1.amazonaws.com");
        assert_eq!(storage.region(), "eu-west-1");

        let custom = ObjectStoreStorage::from_config(
            &SdkConfig::default().with_s3_endpoint_url("http://localhost:9000/"),
        );
        assert_eq!(custom.endpoint(), "http://localhost:9000");
        assert_eq!(custom.region(), "us-east-1");
    }

    #[test]
    fn test_missing_credentials_fail_on_request() {
        let storage = ObjectStoreStorage::new("http://127.0.0.1:9", "us-east-1");
        assert!(matches!(
            storage.read_text("lake", "a.txt"),
            Err(StorageError::Credentials(_))
        ));
        assert!(!storage.exists("lake", "a.txt"));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let rendered = format!("{:?}", creds());
        assert!(!rendered.contains("EXAMPLEKEY"));
    }
}
