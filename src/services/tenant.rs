//! Tenant service: top-level tenant administration.
//!
//! Authenticates with a tenant-management token, not a user session.

use serde_json::{json, Value};
use url::Url;

use super::base::{BlockingClientBase, ClientBase, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::models::TenantConfiguration;
use crate::transport::{AuthMode, CallOptions, RequestSpec};

pub(crate) mod wire {
    use super::*;

    pub fn create(base: &Url, name: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["tenant"])?;
        Ok(RequestSpec::post(url).json(json!({ "name": name })))
    }

    pub fn list(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(base, &["tenant"])?))
    }

    pub fn update(base: &Url, tenant: &TenantConfiguration) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["tenant", &tenant.id])?;
        let body = serde_json::to_value(tenant)
            .map_err(|e| ServiceError::validation(format!("tenant cannot be serialized: {}", e)))?;
        Ok(RequestSpec::patch(url).json(body))
    }

    pub fn delete(base: &Url, tenant_id: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::delete(crate::transport::join_url(
            base,
            &["tenant", tenant_id],
        )?))
    }

    pub fn parse_tenant(value: &Value) -> ServiceResult<TenantConfiguration> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed tenant: {}", e), None))
    }

    pub fn parse_tenants(value: &Value) -> ServiceResult<Vec<TenantConfiguration>> {
        let list = value.get("result").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed tenant list: {}", e), None))
    }
}

/// Async tenant-administration client.
#[derive(Clone)]
pub struct TenantClient {
    pub(crate) base: ClientBase,
    management_token: String,
}

impl TenantClient {
    pub fn new(config: &ServiceConfig, management_token: impl Into<String>) -> ServiceResult<Self> {
        Ok(Self {
            base: ClientBase::new(config)?,
            management_token: management_token.into(),
        })
    }

    fn auth(&self) -> AuthMode {
        AuthMode::Token(self.management_token.clone())
    }

    async fn json(&self, spec: RequestSpec) -> ServiceResult<Value> {
        self.base
            .transport
            .execute_json(spec, self.auth(), CallOptions::default())
            .await
    }

    /// Create a tenant; the response includes its fresh API key.
    pub async fn create_tenant(&self, name: &str) -> ServiceResult<TenantConfiguration> {
        let value = self.json(wire::create(&self.base.base, name)?).await?;
        wire::parse_tenant(&value)
    }

    pub async fn listing_tenants(&self) -> ServiceResult<Vec<TenantConfiguration>> {
        let value = self.json(wire::list(&self.base.base)?).await?;
        wire::parse_tenants(&value)
    }

    pub async fn update_tenant(&self, tenant: &TenantConfiguration) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(
                wire::update(&self.base.base, tenant)?,
                self.auth(),
                CallOptions::default(),
            )
            .await
    }

    pub async fn delete_tenant(&self, tenant_id: &str) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(
                wire::delete(&self.base.base, tenant_id)?,
                self.auth(),
                CallOptions::default(),
            )
            .await
    }
}

/// Blocking tenant-administration client.
#[derive(Clone)]
pub struct BlockingTenantClient {
    pub(crate) base: BlockingClientBase,
    management_token: String,
}

impl BlockingTenantClient {
    pub fn new(config: &ServiceConfig, management_token: impl Into<String>) -> ServiceResult<Self> {
        Ok(Self {
            base: BlockingClientBase::new(config)?,
            management_token: management_token.into(),
        })
    }

    fn auth(&self) -> AuthMode {
        AuthMode::Token(self.management_token.clone())
    }

    fn json(&self, spec: RequestSpec) -> ServiceResult<Value> {
        self.base
            .transport
            .execute_json(spec, self.auth(), CallOptions::default())
    }

    pub fn create_tenant(&self, name: &str) -> ServiceResult<TenantConfiguration> {
        let value = self.json(wire::create(&self.base.base, name)?)?;
        wire::parse_tenant(&value)
    }

    pub fn listing_tenants(&self) -> ServiceResult<Vec<TenantConfiguration>> {
        let value = self.json(wire::list(&self.base.base)?)?;
        wire::parse_tenants(&value)
    }

    pub fn update_tenant(&self, tenant: &TenantConfiguration) -> ServiceResult<()> {
        self.base.transport.execute_empty(
            wire::update(&self.base.base, tenant)?,
            self.auth(),
            CallOptions::default(),
        )
    }

    pub fn delete_tenant(&self, tenant_id: &str) -> ServiceResult<()> {
        self.base.transport.execute_empty(
            wire::delete(&self.base.base, tenant_id)?,
            self.auth(),
            CallOptions::default(),
        )
    }
}
