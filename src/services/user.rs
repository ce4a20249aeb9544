//! User service: tenant-scoped user lifecycle.
//!
//! User management authenticates with the tenant API key rather than a
//! session bearer; the key is supplied per call.

use std::collections::HashMap;

use serde_json::{json, Value};
use url::Url;

use super::base::{BlockingClientBase, ClientBase, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{User, UserRole};
use crate::transport::{AuthMode, CallOptions, RequestSpec};

pub(crate) mod wire {
    use super::*;

    pub fn create(
        base: &Url,
        external_user_id: &str,
        meta_data: &HashMap<String, String>,
        roles: &[UserRole],
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["user"])?;
        Ok(RequestSpec::post(url).json(json!({
            "externalUserId": external_user_id,
            "metaData": meta_data,
            "roles": roles,
        })))
    }

    pub fn list(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(base, &["user"])?))
    }

    pub fn get(base: &Url, internal_id: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["user", internal_id],
        )?))
    }

    pub fn update(
        base: &Url,
        internal_id: &str,
        meta_data: &HashMap<String, String>,
        roles: Option<&[UserRole]>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["user", internal_id])?;
        let mut body = json!({ "metaData": meta_data });
        if let Some(roles) = roles {
            body["roles"] = json!(roles);
        }
        Ok(RequestSpec::patch(url).json(body))
    }

    pub fn delete(
        base: &Url,
        internal_id: &str,
        external_user_id: &str,
        force: bool,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["user", internal_id])?;
        Ok(RequestSpec::delete(url)
            .param("externalUserId", external_user_id)
            .param("force", force.to_string()))
    }

    pub fn parse_user(value: &Value) -> ServiceResult<User> {
        let user = value.get("user").unwrap_or(value);
        serde_json::from_value(user.clone())
            .map_err(|e| ServiceError::parse(format!("malformed user: {}", e), None))
    }

    pub fn parse_users(value: &Value) -> ServiceResult<Vec<User>> {
        let list = value.get("result").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed user list: {}", e), None))
    }
}

/// Async user client.
#[derive(Clone)]
pub struct UserClient {
    pub(crate) base: ClientBase,
}

impl UserClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            base: ClientBase::new(config)?,
        })
    }

    async fn json(&self, spec: RequestSpec, tenant_api_key: &str) -> ServiceResult<Value> {
        self.base
            .transport
            .execute_json(
                spec,
                AuthMode::TenantKey(tenant_api_key.to_string()),
                CallOptions::default(),
            )
            .await
    }

    /// Create the internal shadow user for an external user id.
    pub async fn create_user(
        &self,
        tenant_api_key: &str,
        external_user_id: &str,
        meta_data: &HashMap<String, String>,
        roles: &[UserRole],
    ) -> ServiceResult<User> {
        let value = self
            .json(
                wire::create(&self.base.base, external_user_id, meta_data, roles)?,
                tenant_api_key,
            )
            .await?;
        wire::parse_user(&value)
    }

    /// All users of the tenant.
    pub async fn listing_users(&self, tenant_api_key: &str) -> ServiceResult<Vec<User>> {
        let value = self.json(wire::list(&self.base.base)?, tenant_api_key).await?;
        wire::parse_users(&value)
    }

    pub async fn user(&self, tenant_api_key: &str, internal_id: &str) -> ServiceResult<User> {
        let value = self
            .json(wire::get(&self.base.base, internal_id)?, tenant_api_key)
            .await?;
        wire::parse_user(&value)
    }

    /// Update user metadata and, optionally, roles.
    pub async fn update_user(
        &self,
        tenant_api_key: &str,
        internal_id: &str,
        meta_data: &HashMap<String, String>,
        roles: Option<&[UserRole]>,
    ) -> ServiceResult<User> {
        let value = self
            .json(
                wire::update(&self.base.base, internal_id, meta_data, roles)?,
                tenant_api_key,
            )
            .await?;
        wire::parse_user(&value)
    }

    /// Delete a user; `force` removes their entities too.
    pub async fn delete_user(
        &self,
        tenant_api_key: &str,
        internal_id: &str,
        external_user_id: &str,
        force: bool,
    ) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(
                wire::delete(&self.base.base, internal_id, external_user_id, force)?,
                AuthMode::TenantKey(tenant_api_key.to_string()),
                CallOptions::default(),
            )
            .await
    }
}

/// Blocking user client.
#[derive(Clone)]
pub struct BlockingUserClient {
    pub(crate) base: BlockingClientBase,
}

impl BlockingUserClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            base: BlockingClientBase::new(config)?,
        })
    }

    fn json(&self, spec: RequestSpec, tenant_api_key: &str) -> ServiceResult<Value> {
        self.base.transport.execute_json(
            spec,
            AuthMode::TenantKey(tenant_api_key.to_string()),
            CallOptions::default(),
        )
    }

    pub fn create_user(
        &self,
        tenant_api_key: &str,
        external_user_id: &str,
        meta_data: &HashMap<String, String>,
        roles: &[UserRole],
    ) -> ServiceResult<User> {
        let value = self.json(
            wire::create(&self.base.base, external_user_id, meta_data, roles)?,
            tenant_api_key,
        )?;
        wire::parse_user(&value)
    }

    pub fn listing_users(&self, tenant_api_key: &str) -> ServiceResult<Vec<User>> {
        let value = self.json(wire::list(&self.base.base)?, tenant_api_key)?;
        wire::parse_users(&value)
    }

    pub fn user(&self, tenant_api_key: &str, internal_id: &str) -> ServiceResult<User> {
        let value = self.json(wire::get(&self.base.base, internal_id)?, tenant_api_key)?;
        wire::parse_user(&value)
    }

    pub fn update_user(
        &self,
        tenant_api_key: &str,
        internal_id: &str,
        meta_data: &HashMap<String, String>,
        roles: Option<&[UserRole]>,
    ) -> ServiceResult<User> {
        let value = self.json(
            wire::update(&self.base.base, internal_id, meta_data, roles)?,
            tenant_api_key,
        )?;
        wire::parse_user(&value)
    }

    pub fn delete_user(
        &self,
        tenant_api_key: &str,
        internal_id: &str,
        external_user_id: &str,
        force: bool,
    ) -> ServiceResult<()> {
        self.base.transport.execute_empty(
            wire::delete(&self.base.base, internal_id, external_user_id, force)?,
            AuthMode::TenantKey(tenant_api_key.to_string()),
            CallOptions::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_shape() {
        let base = Url::parse("https://kg.example.com/graph/v1").unwrap();
        let meta = HashMap::from([("team".to_string(), "research".to_string())]);
        let spec = wire::create(&base, "alice", &meta, &[UserRole::User]).unwrap();
        let crate::transport::RequestBody::Json(body) = &spec.body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["externalUserId"], "alice");
        assert_eq!(body["roles"][0], "USER");
        assert_eq!(body["metaData"]["team"], "research");
    }
}
