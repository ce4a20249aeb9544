//! Cooperative (async) transport flavor.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tokio::time::sleep;
use url::Url;

use super::dns::{shared_resolver_with_ttl, SharedResolver};
use super::{
    backoff_delay, join_url, user_agent, AuthMode, AuthTokens, CallOptions, RequestBody,
    RequestSpec, TransportConfig,
};
use crate::error::{ServiceError, ServiceResult};
use crate::session::{Session, TokenManager};

/// Async HTTP client wrapper bound to one auth service.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct AsyncTransport {
    config: Arc<TransportConfig>,
    client: Client,
    auth_url: Url,
}

impl AsyncTransport {
    /// Build a transport whose token operations go to `auth_url`.
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

    /// Log in with tenant credentials and register a permanent session.
    pub async fn login(
        &self,
        tenant_api_key: &str,
        external_user_id: &str,
    ) -> ServiceResult<Session> {
        let tokens = self.post_login(tenant_api_key, external_user_id).await?;
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

    /// Register an externally obtained token pair as a session.
    pub async fn register_token(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> ServiceResult<Session> {
        TokenManager::instance().add_session(access_token, refresh_token, None, None)
    }

    async fn post_login(
        &self,
        tenant_api_key: &str,
        external_user_id: &str,
    ) -> ServiceResult<AuthTokens> {
        let url = join_url(&self.auth_url, &["user", "login"])?;
        let spec = RequestSpec::post(url)
            .json(serde_json::json!({ "externalUserId": external_user_id }));
        let value = self
            .execute_json(
                spec,
                AuthMode::TenantKey(tenant_api_key.to_string()),
                CallOptions::default(),
            )
            .await?;
        serde_json::from_value(value)
            .map_err(|e| ServiceError::parse(format!("malformed login response: {}", e), None))
    }

    /// Exchange a refresh token for a fresh token pair.
    pub async fn post_refresh(&self, refresh_token: &str) -> ServiceResult<AuthTokens> {
        let url = join_url(&self.auth_url, &["user", "refresh"])?;
        let spec =
            RequestSpec::post(url).json(serde_json::json!({ "refreshToken": refresh_token }));
        let value = self
            .execute_json(spec, AuthMode::None, CallOptions::default())
            .await?;
        serde_json::from_value(value)
            .map_err(|e| ServiceError::parse(format!("malformed refresh response: {}", e), None))
    }

    /// Current bearer token for a session, refreshing when it expires
    /// within the configured window (or unconditionally with `force`).
    ///
    /// At most one refresh runs per session; concurrent callers wait on
    /// the session's gate and reuse the fresh token.
    pub async fn session_token(&self, session_id: &str, force: bool) -> ServiceResult<String> {
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
        let _guard = gate.lock().await;
        // Double-check: another caller may have refreshed while we waited.
        let session = manager
            .get_session(session_id)
            .ok_or_else(|| ServiceError::auth_expired(format!("unknown session '{}'", session_id)))?;
        if !force && session.expires_in() > window {
            return Ok(session.access_token().to_string());
        }
        Box::pin(self.refresh_locked(&session)).await
    }

    async fn refresh_locked(&self, session: &Session) -> ServiceResult<String> {
        if let Some(refresh_token) = session.refresh_token() {
            match self.post_refresh(refresh_token).await {
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
            .await
            .map_err(|e| ServiceError::auth_expired(format!("re-authentication failed: {}", e)))?;
        let updated = TokenManager::instance().update_session(
            session.id(),
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
        )?;
        Ok(updated.access_token().to_string())
    }

    // ── Request execution ──────────────────────────────────────────

    async fn auth_header(
        &self,
        auth: &AuthMode,
        force_refresh: bool,
    ) -> ServiceResult<Option<(&'static str, String)>> {
        match auth {
            AuthMode::Session(id) => {
                let token = self.session_token(id, force_refresh).await?;
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
    ) -> ServiceResult<reqwest::RequestBuilder> {
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

    /// Dispatch with retry, backoff and single forced refresh on 401.
    pub async fn send(
        &self,
        spec: &RequestSpec,
        auth: &AuthMode,
        options: &CallOptions,
    ) -> ServiceResult<reqwest::Response> {
        let auth = match &options.overwrite_token {
            Some(token) => AuthMode::Token(token.clone()),
            None => auth.clone(),
        };
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let mut force_refresh = false;
        let mut refreshed_after_reject = false;
        let mut attempt: u32 = 0;
        loop {
            let header = self.auth_header(&auth, force_refresh).await?;
            force_refresh = false;
            let request = self.build_request(spec, header, timeout)?;
            match request.send().await {
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
                    let body = response.text().await.unwrap_or_default();
                    if ServiceError::is_retryable_status(status) && attempt < self.config.max_retries
                    {
                        let delay = backoff_delay(&self.config, attempt);
                        tracing::warn!(
                            url = %spec.url,
                            status = status,
                            attempt = attempt,
                            "transient response, backing off"
                        );
                        sleep(delay).await;
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
                        sleep(delay).await;
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

    /// Execute and decode a JSON response; empty bodies become `Null`.
    pub async fn execute_json(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<Value> {
        let response = self.send(&spec, &auth, &options).await?;
        let text = response.text().await?;
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

    /// Execute, discarding the response body.
    pub async fn execute_empty(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<()> {
        self.send(&spec, &auth, &options).await.map(|_| ())
    }

    /// Execute and return the raw response bytes.
    pub async fn execute_bytes(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<Vec<u8>> {
        let response = self.send(&spec, &auth, &options).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Execute and return the response body as text.
    pub async fn execute_text(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<String> {
        let response = self.send(&spec, &auth, &options).await?;
        Ok(response.text().await?)
    }

    /// Execute and consume the response line by line (NDJSON).
    pub async fn stream_lines(
        &self,
        spec: RequestSpec,
        auth: AuthMode,
        options: CallOptions,
    ) -> ServiceResult<NdjsonLines> {
        let response = self.send(&spec, &auth, &options).await?;
        Ok(NdjsonLines {
            response,
            buffer: Vec::new(),
            done: false,
        })
    }
}

/// Line-by-line consumer of a streaming NDJSON response.
///
/// Not thread-safe; one consumer per stream.
pub struct NdjsonLines {
    response: reqwest::Response,
    buffer: Vec<u8>,
    done: bool,
}

impl NdjsonLines {
    /// Next non-empty line, or `None` once the stream is exhausted.
    pub async fn next_line(&mut self) -> ServiceResult<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                let line = String::from_utf8_lossy(&line).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }
            if self.done {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = String::from_utf8_lossy(&self.buffer).trim().to_string();
                self.buffer.clear();
                if rest.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(rest));
            }
            match self.response.chunk().await {
                Ok(Some(chunk)) => self.buffer.extend_from_slice(&chunk),
                Ok(None) => self.done = true,
                Err(err) => {
                    self.done = true;
                    self.buffer.clear();
                    return Err(ServiceError::Http(err));
                }
            }
        }
    }

    /// Adapt to a `futures::Stream` of lines.
    pub fn into_stream(self) -> impl futures::Stream<Item = ServiceResult<String>> {
        futures::stream::unfold(self, |mut lines| async move {
            match lines.next_line().await {
                Ok(Some(line)) => Some((Ok(line), lines)),
                Ok(None) => None,
                Err(err) => Some((Err(err), lines)),
            }
        })
    }
}
