//! Shared plumbing for service clients.
//!
//! Every service client is a thin shell around a transport: it owns a
//! base URL, an optional active session and the request builders for
//! its endpoints. Construction is identical across services, so it
//! lives here once, for both flavors.

use url::Url;

use crate::error::{ServiceError, ServiceResult};
use crate::session::Session;
use crate::transport::blocking::BlockingTransport;
use crate::transport::http::AsyncTransport;
use crate::transport::{AuthMode, TransportConfig};

/// Connection parameters for a service client.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the service, e.g. `https://kg.example.com/graph/v1`.
    pub service_url: Url,
    /// Base URL of the auth service; defaults to `service_url`.
    pub auth_url: Option<Url>,
    pub transport: TransportConfig,
}

impl ServiceConfig {
    pub fn new(service_url: Url) -> Self {
        Self {
            service_url,
            auth_url: None,
            transport: TransportConfig::default(),
        }
    }

    pub fn with_auth_url(mut self, auth_url: Url) -> Self {
        self.auth_url = Some(auth_url);
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    fn effective_auth_url(&self) -> Url {
        self.auth_url
            .clone()
            .unwrap_or_else(|| self.service_url.clone())
    }
}

macro_rules! client_base {
    ($(#[$doc:meta])* $name:ident, $transport:ty) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name {
            pub(crate) transport: $transport,
            pub(crate) base: Url,
            pub(crate) session_id: Option<String>,
        }

        impl $name {
            pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
                let transport =
                    <$transport>::new(config.transport.clone(), config.effective_auth_url())?;
                Ok(Self {
                    transport,
                    base: config.service_url.clone(),
                    session_id: None,
                })
            }

            /// Share an existing transport (and its connection pool).
            pub fn with_transport(transport: $transport, service_url: Url) -> Self {
                Self {
                    transport,
                    base: service_url,
                    session_id: None,
                }
            }

            /// Bind this client to an already registered session.
            pub fn use_session(&mut self, session: &Session) {
                self.session_id = Some(session.id().to_string());
            }

            /// Bind this client to a session by id.
            pub fn use_session_id(&mut self, session_id: impl Into<String>) {
                self.session_id = Some(session_id.into());
            }

            /// Id of the active session, if any.
            pub fn session_id(&self) -> Option<&str> {
                self.session_id.as_deref()
            }

            pub(crate) fn auth(&self) -> ServiceResult<AuthMode> {
                self.session_id
                    .as_deref()
                    .map(|id| AuthMode::Session(id.to_string()))
                    .ok_or_else(|| {
                        ServiceError::auth_expired("client has no active session; log in first")
                    })
            }

            pub fn transport(&self) -> &$transport {
                &self.transport
            }
        }
    };
}

client_base! {
    /// Async client core: transport + base URL + active session.
    ClientBase, AsyncTransport
}

client_base! {
    /// Blocking client core: transport + base URL + active session.
    BlockingClientBase, BlockingTransport
}

impl ClientBase {
    /// Log in with tenant credentials; the new session becomes active.
    pub async fn login(
        &mut self,
        tenant_api_key: &str,
        external_user_id: &str,
    ) -> ServiceResult<Session> {
        let session = self.transport.login(tenant_api_key, external_user_id).await?;
        self.session_id = Some(session.id().to_string());
        Ok(session)
    }

    /// Register an externally obtained token pair; becomes active.
    pub async fn register_token(
        &mut self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> ServiceResult<Session> {
        let session = self
            .transport
            .register_token(access_token, refresh_token)
            .await?;
        self.session_id = Some(session.id().to_string());
        Ok(session)
    }

    /// Drop the active session from the manager and this client.
    pub fn logout(&mut self) {
        if let Some(id) = self.session_id.take() {
            crate::session::TokenManager::instance().remove_session(&id);
        }
    }
}

impl BlockingClientBase {
    pub fn login(
        &mut self,
        tenant_api_key: &str,
        external_user_id: &str,
    ) -> ServiceResult<Session> {
        let session = self.transport.login(tenant_api_key, external_user_id)?;
        self.session_id = Some(session.id().to_string());
        Ok(session)
    }

    pub fn register_token(
        &mut self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> ServiceResult<Session> {
        let session = self.transport.register_token(access_token, refresh_token)?;
        self.session_id = Some(session.id().to_string());
        Ok(session)
    }

    pub fn logout(&mut self) {
        if let Some(id) = self.session_id.take() {
            crate::session::TokenManager::instance().remove_session(&id);
        }
    }
}
