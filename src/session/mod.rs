//! Sessions and the process-wide token manager.
//!
//! A session is an access token plus whatever recovery material the
//! caller supplied at login time. Three kinds exist:
//!
//! - [`PermanentSession`]: tenant API key + external user id; can
//!   always re-authenticate from scratch.
//! - [`RefreshableSession`]: refresh token only; lives until the
//!   refresh token expires.
//! - [`TimedSession`]: bare access token; dies with it.
//!
//! The [`TokenManager`] singleton owns every session in the process
//! and hands out per-session refresh gates so that at most one refresh
//! is in flight per session at any time.

pub mod token;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;

use crate::error::{ServiceError, ServiceResult};
use token::{decode_claims, session_id_for, TokenClaims};

/// Credentials a permanent session can re-authenticate from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub tenant_api_key: String,
    pub external_user_id: String,
}

/// Token-only session; expires with its access token.
#[derive(Debug, Clone)]
pub struct TimedSession {
    pub(crate) id: String,
    pub(crate) access_token: String,
    pub(crate) expiration: i64,
}

/// Session with a refresh token but no credentials.
#[derive(Debug, Clone)]
pub struct RefreshableSession {
    pub(crate) id: String,
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) expiration: i64,
}

/// Session backed by tenant credentials; survives any token loss.
#[derive(Debug, Clone)]
pub struct PermanentSession {
    pub(crate) id: String,
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expiration: i64,
    pub(crate) credentials: SessionCredentials,
}

/// One authenticated identity against the platform.
#[derive(Debug, Clone)]
pub enum Session {
    Permanent(PermanentSession),
    Refreshable(RefreshableSession),
    Timed(TimedSession),
}

impl Session {
    /// Stable id derived from the token's identity claims.
    pub fn id(&self) -> &str {
        match self {
            Session::Permanent(s) => &s.id,
            Session::Refreshable(s) => &s.id,
            Session::Timed(s) => &s.id,
        }
    }

    pub fn access_token(&self) -> &str {
        match self {
            Session::Permanent(s) => &s.access_token,
            Session::Refreshable(s) => &s.access_token,
            Session::Timed(s) => &s.access_token,
        }
    }

    pub fn refresh_token(&self) -> Option<&str> {
        match self {
            Session::Permanent(s) => s.refresh_token.as_deref(),
            Session::Refreshable(s) => Some(&s.refresh_token),
            Session::Timed(_) => None,
        }
    }

    /// Credentials for from-scratch re-authentication, if any.
    pub fn credentials(&self) -> Option<&SessionCredentials> {
        match self {
            Session::Permanent(s) => Some(&s.credentials),
            _ => None,
        }
    }

    /// Expiry instant of the access token.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let expiration = match self {
            Session::Permanent(s) => s.expiration,
            Session::Refreshable(s) => s.expiration,
            Session::Timed(s) => s.expiration,
        };
        Utc.timestamp_opt(expiration, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Seconds until the access token expires; negative when it has.
    pub fn expires_in(&self) -> i64 {
        let expiration = match self {
            Session::Permanent(s) => s.expiration,
            Session::Refreshable(s) => s.expiration,
            Session::Timed(s) => s.expiration,
        };
        expiration - Utc::now().timestamp()
    }

    /// True for every variant that can obtain a fresh access token.
    pub fn refreshable(&self) -> bool {
        !matches!(self, Session::Timed(_))
    }

    /// Replace the tokens atomically after a refresh or re-login.
    pub fn update_tokens(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
    ) -> ServiceResult<()> {
        let claims = decode_claims(&access_token)?;
        match self {
            Session::Permanent(s) => {
                s.access_token = access_token;
                if refresh_token.is_some() {
                    s.refresh_token = refresh_token;
                }
                s.expiration = claims.exp;
            }
            Session::Refreshable(s) => {
                s.access_token = access_token;
                if let Some(refresh_token) = refresh_token {
                    s.refresh_token = refresh_token;
                }
                s.expiration = claims.exp;
            }
            Session::Timed(s) => {
                s.access_token = access_token;
                s.expiration = claims.exp;
            }
        }
        Ok(())
    }

    /// Claims decoded from the current access token.
    pub fn claims(&self) -> ServiceResult<TokenClaims> {
        decode_claims(self.access_token())
    }
}

struct SessionEntry {
    session: Session,
    refresh_gate: Arc<Mutex<()>>,
}

/// Process-wide registry of sessions.
pub struct TokenManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

static INSTANCE: OnceLock<TokenManager> = OnceLock::new();

impl TokenManager {
    fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide manager.
    pub fn instance() -> &'static TokenManager {
        INSTANCE.get_or_init(TokenManager::new)
    }

    /// Register a session, choosing the variant by what was supplied:
    /// credentials make it permanent, a bare refresh token makes it
    /// refreshable, a lone access token makes it timed.
    pub fn add_session(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        tenant_api_key: Option<&str>,
        external_user_id: Option<&str>,
    ) -> ServiceResult<Session> {
        let claims = decode_claims(access_token)?;
        let id = session_id_for(access_token, &claims);
        let session = match (tenant_api_key, external_user_id) {
            (Some(key), Some(user)) => Session::Permanent(PermanentSession {
                id: id.clone(),
                access_token: access_token.to_string(),
                refresh_token: refresh_token.map(str::to_string),
                expiration: claims.exp,
                credentials: SessionCredentials {
                    tenant_api_key: key.to_string(),
                    external_user_id: user.to_string(),
                },
            }),
            _ => match refresh_token {
                Some(refresh_token) => Session::Refreshable(RefreshableSession {
                    id: id.clone(),
                    access_token: access_token.to_string(),
                    refresh_token: refresh_token.to_string(),
                    expiration: claims.exp,
                }),
                None => Session::Timed(TimedSession {
                    id: id.clone(),
                    access_token: access_token.to_string(),
                    expiration: claims.exp,
                }),
            },
        };
        let mut sessions = self.sessions.write().expect("session map poisoned");
        let entry = sessions.entry(id).or_insert_with(|| SessionEntry {
            session: session.clone(),
            refresh_gate: Arc::new(Mutex::new(())),
        });
        entry.session = session.clone();
        Ok(session)
    }

    /// Snapshot of a session by id.
    pub fn get_session(&self, id: &str) -> Option<Session> {
        self.sessions
            .read()
            .expect("session map poisoned")
            .get(id)
            .map(|entry| entry.session.clone())
    }

    pub fn has_session(&self, id: &str) -> bool {
        self.sessions
            .read()
            .expect("session map poisoned")
            .contains_key(id)
    }

    pub fn remove_session(&self, id: &str) {
        self.sessions
            .write()
            .expect("session map poisoned")
            .remove(id);
    }

    /// Snapshots of all registered sessions.
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions
            .read()
            .expect("session map poisoned")
            .values()
            .map(|entry| entry.session.clone())
            .collect()
    }

    /// Replace a session's tokens atomically.
    pub fn update_session(
        &self,
        id: &str,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> ServiceResult<Session> {
        let mut sessions = self.sessions.write().expect("session map poisoned");
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| ServiceError::auth_expired(format!("unknown session '{}'", id)))?;
        entry
            .session
            .update_tokens(access_token.to_string(), refresh_token.map(str::to_string))?;
        Ok(entry.session.clone())
    }

    /// Per-session mutex serializing token refresh.
    pub fn refresh_gate(&self, id: &str) -> ServiceResult<Arc<Mutex<()>>> {
        self.sessions
            .read()
            .expect("session map poisoned")
            .get(id)
            .map(|entry| Arc::clone(&entry.refresh_gate))
            .ok_or_else(|| ServiceError::auth_expired(format!("unknown session '{}'", id)))
    }

    /// Drop every session. Intended for process teardown and tests.
    pub fn clear(&self) {
        self.sessions.write().expect("session map poisoned").clear();
    }
}
