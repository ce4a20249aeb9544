//! Thread-based (blocking) transport flavor.
//!
//! Mirrors [`super::http::AsyncTransport`] over `reqwest::blocking`;
//! the refresh gate is the same per-session `tokio::sync::Mutex`,
//! taken with `blocking_lock`, so blocking and async callers sharing a
//! session still serialize their refreshes against each other.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde_json::Value;
use url::Url;

use super::dns::{shared_resolver_with_ttl, SharedResolver};
use super::{
    backoff_delay, join_url, user_agent, AuthMode, AuthTokens, CallOptions, RequestBody,
    RequestSpec, TransportConfig,
};
use crate::error::{ServiceError, ServiceResult};
use crate::session::{Session, TokenManager};

/// Blocking HTTP client wrapper bound to one auth service.
#[derive(Clone)]
pub struct BlockingTransport {
    config: Arc<TransportConfig>,
    client: Client,
    auth_url: Url,
}

impl BlockingTransport {
    pub fn new(config: TransportConfig, auth_url: Url) -> ServiceResult<Self> {
        let resolver = shared_resolver_with_ttl(config.dns_ttl);
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(config.timeout)
            .dns_resolver(Arc::new(SharedResolver(resolver)))
            .build()?;
        Ok(Self {
            config: Arc::new(config),
            client,
            auth_url,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    // ── Authentication ─────────────────────────────────────────────

    pub fn login(&self, tenant_api_key: &str, external_user_id: &str) -> ServiceResult<Session> {
        let tokens = self.post_login(tenant_api_key, external_user_id)?;
        if let Some(ref expiration) = tokens.expiration_date {
            tracing::debug!(expiration = %expiration, "login token issued");
        }
        TokenManager::instance().add_session(
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
            Some(tenant_api_key),
            Some(external_user_id),
        )
    }

    pub fn register_token(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> ServiceResult<Session> {
        TokenManager::instance().add_session(access_token, refresh_token, None, None)
    }

    fn post_login(
        &self,
        tenant_api_key: &str,
        external_user_id: &str,
    ) -> ServiceResult<AuthTokens> {
        let url = join_url(&self.auth_url, &["user", "login"])?;
        let spec = RequestSpec::post(url)
            .json(serde_json::json!({ "externalUserId": external_user_id }));
        let value = self.execute_json(
            spec,
            AuthMode::TenantKey(tenant_api_key.to_string()),
            CallOptions::default(),
        )?;
        serde_json::from_value(value)
            .map_err(|e| ServiceError::parse(format!("malformed login response: {}", e), None))
    }

    pub fn post_refresh(&self, refresh_token: &str) -> ServiceResult<AuthTokens> {
        let url = join_url(&self.auth_url, &["user", "refresh"])?;
        let spec =
            RequestSpec::post(url).json(serde_json::json!({ "refreshToken": refresh_token }));
        let value = self.execute_json(spec, AuthMode::None, CallOptions::default())?;
        serde_json::from_value(value)
            .map_err(|e| ServiceError::parse(format!("malformed refresh response: {}", e), None))
    }

    /// Blocking counterpart of [`super::http::AsyncTransport::session_token`].
    pub fn session_token(&self, session_id: &str, force: bool) -> ServiceResult<String> {
        let manager = TokenManager::instance();
        let session = manager
            .get_session(session_id)
            .ok_or_else(|| ServiceError::auth_expired(format!("unknown session '{}'", session_id)))?;
        let window = self.config.refresh_window.as_secs() as i64;
        if !force && session.expires_in() > window {
            return Ok(session.access_token().to_string());
        }
        if !session.refreshable() {
            if !force && session.expires_in() > 0 {
                return Ok(session.access_token().to_string());
            }
            return Err(ServiceError::auth_expired(
                "session has no refresh capability",
            ));
        }
        let gate = manager.refresh_gate(session_id)?;
        let _guard = gate.blocking_lock();
        let session = manager
            .get_session(session_id)
            .ok_or_else(|| ServiceError::auth_expired(format!("unknown session '{}'", session_id)))?;
        if !force && session.expires_in() > window {
            return Ok(session.access_token().to_string());
        }
        self.refresh_locked(&session)
    }

    fn refresh_locked(&self, session: &Session) -> ServiceResult<String> {
        if let Some(refresh_token) = session.refresh_token() {
            match self.post_refresh(refresh_token) {
                Ok(tokens) => {
                    let updated = TokenManager::instance().update_session(
                        session.id(),
                        &tokens.access_token,
                        tokens.refresh_token.as_deref(),
                    )?;
                    return Ok(updated.access_token().to_string());
                }
                Err(err) => {
                    tracing::warn!(session = %session.id(), error = %err, "token refresh failed");
                }
            }
        }
        let Some(credentials) = session.credentials() else {
            return Err(ServiceError::auth_expired(
                "refresh token rejected and session holds no credentials",
            ));
        };
        let tokens = self
            .post_login(&credentials.tenant_api_key, &credentials.external_user_id)
            .map_err(|e| ServiceError::auth_expired(format!("re-authentication failed: {}", e)))?;
        let updated = TokenManager::instance().update_session(
            session.id(),
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
        )?;
        Ok(updated.access_token().to_string())
    }

    // ── Request execution ──────────────────────────────────────────

    fn auth_header(
        &self,
        auth: &AuthMode,
        force_refresh: bool,
    ) -> ServiceResult<Option<(&'static str, String)>> {
        match auth {
            AuthMode::Session(id) => {
                let token = self.session_token(id, force_refresh)?;
                Ok(Some(("Authorization", format!("Bearer {}", token))))
            }
            AuthMode::Token(token) => Ok(Some(("Authorization", format!("Bearer {}", token)))),
            AuthMode::TenantKey(key) => Ok(Some(("x-tenant-api-key", key.clone()))),
            AuthMode::None => Ok(None),
        }
    }

    fn build_request(
        &self,
        spec: &RequestSpec,
        auth_header: Option<(&'static str, String)>,
        timeout: Duration,
    ) -> ServiceResult<reqwest::blocking::RequestBuilder> {
        let mut builder = self
            .client
            .request(spec.method.clone(), spec.url.clone())
            .timeout(timeout);
        if !spec.params.is_empty() {
            builder = builder.query(&spec.params);
        }
        for (key, value) in &spec.headers {
            builder = builder.header(key, value);
        }
        if let Some((name, value)) = auth_header {
            builder = builder.header(name, value);
        }
        builder = match &spec.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Bytes { data, content_type } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data.clone()),
            RequestBody::Multipart {
                part_name,
                file_name,
                mime_type,
                data,
            } => {
                let part = Part::bytes(data.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)
                    .map_err(|e| {
                        ServiceError::validation(format!("invalid mime type '{}': {}", mime_type, e))
                    })?;
                builder.multipart(Form::new().part(part_name.clone(), part))
            }
        };
        Ok(builder)
    }

    pub fn send(
        &self,
        spec: &RequestSpec,
        auth: &AuthMode,
        options: &CallOptions,
    ) -> ServiceResult<reqwest::blocking::Response> {
        let auth = match &options.overwrite_token {
            Some(token) => AuthMode::Token(token.clone()),
            None => auth.clone(),
        };
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut force_refresh = false;
        let mut refreshed_after_reject = false;
        let mut attempt: u32 = 0;
        loop {
            let header = self.auth_header(&auth, force_refresh)?;
            force_refresh = false;
            let request = self.build_request(spec, header, timeout)?;
            match request.send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        return Ok(response);
                    }
                    if (status == 401 || status == 419)
                        && matches!(auth, AuthMode::Session(_))
                        && !refreshed_after_reject
                    {
                        refreshed_after_reject = true;
                        force_refresh = true;
                        tracing::debug!(url = %spec.url, "bearer rejected, forcing a refresh");
                        continue;
                    }
                    let body = response.text().unwrap_or_default();
                    if ServiceError::is_retryable_status(status) && attempt < self.config.max_retries
                    {
                        let delay = backoff_delay(&self.config, attempt);
                        tracing::warn!(
                            url = %spec.url,
                            status = status,
                            attempt = attempt,
                            "transient response, backing off"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(ServiceError::from_status(
                        spec.envelope(status, Some(&body)),
                        attempt + 1,
                    ));
                }
                Err(err) => {
                    let retryable = err.is_connect() || err.is_timeout();
                    if retryable && attempt < self.config.max_retries {
                        let delay = backoff_delay(&self.config, attempt);
                        tracing::warn!(
                            url = %spec.url,
                            error = %err,
                            attempt = attempt,
                            "transport fault, backing off"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    if err.is_timeout() {
                        return Err(ServiceError::Transient {
                            envelope: Box::new(spec.envelope(0, Some("timeout"))),
                            attempts: attempt + 1,
                        });
                    }
                    return Err(ServiceError::Http(err));
                }
            }
        }
    }

    pub fn execute_json(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<Value> {
        let response = self.send(&spec, &auth, &options)?;
        let text = response.text()?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            ServiceError::parse(
                format!("invalid JSON from {}: {}", spec.url, e),
                Some(text.chars().take(500).collect()),
            )
        })
    }

    pub fn execute_empty(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<()> {
        self.send(&spec, &auth, &options).map(|_| ())
    }

    pub fn execute_bytes(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<Vec<u8>> {
        let response = self.send(&spec, &auth, &options)?;
        Ok(response.bytes()?.to_vec())
    }

    pub fn execute_text(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<String> {
        let response = self.send(&spec, &auth, &options)?;
        Ok(response.text()?)
    }

    /// Execute and consume the response line by line (NDJSON).
    pub fn stream_lines(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<BlockingNdjsonLines> {
        let response = self.send(&spec, &auth, &options)?;
        Ok(BlockingNdjsonLines {
            reader: std::io::BufReader::new(response),
        })
    }
}

/// Line-by-line consumer of a blocking NDJSON response.
pub struct BlockingNdjsonLines {
    reader: std::io::BufReader<reqwest::blocking::Response>,
}

impl BlockingNdjsonLines {
    /// Next non-empty line, or `None` once the stream is exhausted.
    pub fn next_line(&mut self) -> ServiceResult<Option<String>> {
        use std::io::BufRead;
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| ServiceError::parse(format!("stream read failed: {}", e), None))?;
            if read == 0 {
                return Ok(None);
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(Some(line.to_string()));
        }
    }
}

impl Iterator for BlockingNdjsonLines {
    type Item = ServiceResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}
