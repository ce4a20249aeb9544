//! Error handling for the personal knowledge client.
//!
//! Every fallible operation in this crate returns [`ServiceResult`]. The
//! error kinds mirror the platform contract: validation failures never
//! reach the wire, authentication failures are distinguished from plain
//! HTTP failures, and everything that did reach the wire carries an
//! [`ErrorEnvelope`] describing the exchange.

use std::fmt;

use thiserror::Error;

/// Maximum number of response bytes preserved in an envelope snippet.
pub const RESPONSE_SNIPPET_LIMIT: usize = 500;

/// Description of a failed HTTP exchange.
///
/// The payload itself is never stored; only a SHA-256 digest, so that
/// envelopes are safe to log even for requests carrying user content.
#[derive(Debug, Clone, Default)]
pub struct ErrorEnvelope {
    /// HTTP method of the failed request.
    pub method: String,
    /// Full request URL.
    pub url: String,
    /// Query parameters sent with the request.
    pub params: Vec<(String, String)>,
    /// SHA-256 hex digest of the request payload, if one was sent.
    pub payload_digest: Option<String>,
    /// Request headers with credential values redacted.
    pub headers: Vec<(String, String)>,
    /// HTTP status code; `0` when the request never completed.
    pub status_code: u16,
    /// Leading bytes of the server response body.
    pub service_response: Option<String>,
}

impl ErrorEnvelope {
    /// Truncate and attach a response body snippet.
    pub fn with_response(mut self, body: &str) -> Self {
        let snippet: String = body.chars().take(RESPONSE_SNIPPET_LIMIT).collect();
        self.service_response = Some(snippet);
        self
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.url, self.status_code)?;
        if let Some(ref body) = self.service_response {
            write!(f, " ({})", body)?;
        }
        Ok(())
    }
}

/// Main error type for the personal knowledge client.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed input detected before any HTTP call was made.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// The session token could not be refreshed; the caller must log in again.
    #[error("Authentication expired: {message}")]
    AuthExpired { message: String },

    /// Server rejected the operation with 403.
    #[error("Forbidden: {envelope}")]
    Forbidden { envelope: Box<ErrorEnvelope> },

    /// Server returned 404 for the target resource.
    #[error("Not found: {envelope}")]
    NotFound { envelope: Box<ErrorEnvelope> },

    /// Server returned 409 (duplicate source reference, rule violation).
    #[error("Conflict: {envelope}")]
    Conflict { envelope: Box<ErrorEnvelope> },

    /// Retryable fault that survived all retry attempts.
    #[error("Transient failure after {attempts} attempt(s): {envelope}")]
    Transient {
        envelope: Box<ErrorEnvelope>,
        attempts: u32,
    },

    /// Any other non-success response from the service.
    #[error("Service error: {envelope}")]
    Backend { envelope: Box<ErrorEnvelope> },

    /// Response body did not match the expected schema.
    #[error("Response parse error: {message}")]
    Parse {
        message: String,
        snippet: Option<String>,
    },

    /// Failure inside the HTTP stack before a response was obtained.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ServiceError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for an expired-authentication failure.
    pub fn auth_expired(message: impl Into<String>) -> Self {
        ServiceError::AuthExpired {
            message: message.into(),
        }
    }

    /// Shorthand for a schema mismatch while decoding a response.
    pub fn parse(message: impl Into<String>, snippet: Option<String>) -> Self {
        ServiceError::Parse {
            message: message.into(),
            snippet,
        }
    }

    /// Map a non-success HTTP status to the matching error kind.
    ///
    /// 429 and 5xx are handled by the transport retry loop before this is
    /// reached; when they arrive here the retries were already exhausted.
    pub fn from_status(envelope: ErrorEnvelope, attempts: u32) -> Self {
        let envelope = Box::new(envelope);
        match envelope.status_code {
            401 | 419 => ServiceError::AuthExpired {
                message: format!("token rejected by {}", envelope.url),
            },
            403 => ServiceError::Forbidden { envelope },
            404 => ServiceError::NotFound { envelope },
            409 => ServiceError::Conflict { envelope },
            429 | 500..=599 => ServiceError::Transient { envelope, attempts },
            _ => ServiceError::Backend { envelope },
        }
    }

    /// True for faults the transport is allowed to retry.
    pub fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..=599).contains(&status)
    }

    /// The HTTP status carried by this error, if the request completed.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Forbidden { envelope }
            | ServiceError::NotFound { envelope }
            | ServiceError::Conflict { envelope }
            | ServiceError::Backend { envelope }
            | ServiceError::Transient { envelope, .. } => Some(envelope.status_code),
            _ => None,
        }
    }
}

/// Result type alias used across the crate.
pub type ServiceResult<T> = Result<T, ServiceError>;
