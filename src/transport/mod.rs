//! HTTP transport shared by every service client.
//!
//! Two flavors are built from the same configuration: [`http::AsyncTransport`]
//! for cooperative code and [`blocking::BlockingTransport`] for thread-based
//! callers. Both attach auth headers, retry transient faults with
//! exponential backoff, gate token refresh through the session manager
//! and map failures into [`crate::error::ServiceError`].

pub mod blocking;
pub mod dns;
pub mod http;

use std::time::Duration;

use rand::Rng;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::ErrorEnvelope;

/// Library identifier sent as the `User-Agent`.
pub fn user_agent() -> String {
    format!("personal-knowledge/{}", env!("CARGO_PKG_VERSION"))
}

/// Append path segments to a base URL.
///
/// Built via the segment API rather than `Url::join` so base paths
/// without a trailing slash are never truncated.
pub(crate) fn join_url(base: &Url, segments: &[&str]) -> crate::error::ServiceResult<Url> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| crate::error::ServiceError::validation("service URL cannot be a base"))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

/// Tuning knobs shared by both transport flavors.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Maximum retry attempts for transient faults.
    pub max_retries: u32,
    /// Base of the exponential backoff, in seconds.
    pub backoff_factor: f64,
    /// Per-call timeout unless overridden.
    pub timeout: Duration,
    /// Tokens expiring within this window are refreshed before use.
    pub refresh_window: Duration,
    /// TTL of cached DNS resolutions.
    pub dns_ttl: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 0.5,
            timeout: Duration::from_secs(60),
            refresh_window: Duration::from_secs(120),
            dns_ttl: Duration::from_secs(300),
        }
    }
}

/// Sleep before retry `attempt` (zero-based): exponential with up to
/// 25% jitter so herds of clients do not retry in lockstep.
pub(crate) fn backoff_delay(config: &TransportConfig, attempt: u32) -> Duration {
    let base = config.backoff_factor * f64::from(2u32.saturating_pow(attempt));
    let jitter = rand::thread_rng().gen_range(0.0..0.25) * base;
    Duration::from_secs_f64(base + jitter)
}

/// How a request authenticates.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Bearer token managed by the session manager, refreshed as needed.
    Session(String),
    /// Verbatim bearer token; refresh is skipped entirely.
    Token(String),
    /// `x-tenant-api-key` header instead of a bearer token.
    TenantKey(String),
    /// Unauthenticated (login, refresh).
    None,
}

/// Request body variants the transport knows how to (re)build per attempt.
#[derive(Debug, Clone)]
pub enum RequestBody {
    None,
    Json(Value),
    Bytes {
        data: Vec<u8>,
        content_type: String,
    },
    /// Multipart file upload; rebuilt for every retry attempt since
    /// multipart forms are single-use.
    Multipart {
        part_name: String,
        file_name: String,
        mime_type: String,
        data: Vec<u8>,
    },
}

/// A fully described request, independent of the transport flavor.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: Url,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestSpec {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            params: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn opt_param(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Bytes {
            data,
            content_type: content_type.into(),
        };
        self
    }

    pub fn multipart(
        mut self,
        part_name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.body = RequestBody::Multipart {
            part_name: part_name.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        };
        self
    }

    /// SHA-256 digest of the payload, for error envelopes.
    pub fn payload_digest(&self) -> Option<String> {
        let bytes: Vec<u8> = match &self.body {
            RequestBody::None => return None,
            RequestBody::Json(value) => value.to_string().into_bytes(),
            RequestBody::Bytes { data, .. } => data.clone(),
            RequestBody::Multipart { data, .. } => data.clone(),
        };
        Some(hex::encode(Sha256::digest(bytes)))
    }

    /// Error envelope for a failed exchange of this request.
    pub(crate) fn envelope(&self, status_code: u16, body: Option<&str>) -> ErrorEnvelope {
        let headers = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("authorization")
                    || k.eq_ignore_ascii_case("x-tenant-api-key")
                {
                    (k.clone(), "<redacted>".to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect();
        let envelope = ErrorEnvelope {
            method: self.method.to_string(),
            url: self.url.to_string(),
            params: self.params.clone(),
            payload_digest: self.payload_digest(),
            headers,
            status_code,
            service_response: None,
        };
        match body {
            Some(body) => envelope.with_response(body),
            None => envelope,
        }
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Use this bearer token verbatim and skip refresh.
    pub overwrite_token: Option<String>,
    /// Override the configured per-call timeout.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            overwrite_token: Some(token.into()),
            timeout: None,
        }
    }
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: Option<String>,
    /// Audit-only; expiry decisions use the JWT `exp` claim.
    #[serde(rename = "expirationDate", default)]
    pub expiration_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        let config = TransportConfig {
            backoff_factor: 1.0,
            ..Default::default()
        };
        let first = backoff_delay(&config, 0);
        let third = backoff_delay(&config, 2);
        assert!(first >= Duration::from_secs(1));
        assert!(first < Duration::from_millis(1251));
        assert!(third >= Duration::from_secs(4));
        assert!(third < Duration::from_secs(6));
    }

    #[test]
    fn digest_covers_json_body() {
        let spec = RequestSpec::post(Url::parse("https://kg.example.com/entity").unwrap())
            .json(serde_json::json!({"a": 1}));
        let digest = spec.payload_digest().unwrap();
        assert_eq!(digest.len(), 64);
        assert!(RequestSpec::get(Url::parse("https://kg.example.com/entity").unwrap())
            .payload_digest()
            .is_none());
    }

    #[test]
    fn join_url_handles_trailing_slashes() {
        let base = Url::parse("https://kg.example.com/graph/v1").unwrap();
        let url = join_url(&base, &["entity", "wacom:entity:1"]).unwrap();
        assert_eq!(url.path(), "/graph/v1/entity/wacom:entity:1");

        let slashed = Url::parse("https://kg.example.com/graph/v1/").unwrap();
        let url = join_url(&slashed, &["entity"]).unwrap();
        assert_eq!(url.path(), "/graph/v1/entity");

        // An empty final segment yields the trailing-slash endpoints
        // some services require.
        let url = join_url(&base, &["api", "v1", "documents", ""]).unwrap();
        assert_eq!(url.path(), "/graph/v1/api/v1/documents/");
    }

    #[test]
    fn envelope_redacts_credentials() {
        let spec = RequestSpec::get(Url::parse("https://kg.example.com/entity").unwrap())
            .header("Authorization", "Bearer secret")
            .header("x-tenant-api-key", "key")
            .header("Accept", "application/json");
        let envelope = spec.envelope(500, Some("boom"));
        assert!(envelope
            .headers
            .iter()
            .all(|(_, v)| v != "Bearer secret" && v != "key"));
        assert!(envelope
            .headers
            .iter()
            .any(|(k, v)| k == "Accept" && v == "application/json"));
    }
}
