//! Group service: sharing circles, membership, entity sharing.

use serde_json::{json, Value};
use url::Url;

use super::base::{BlockingClientBase, ClientBase, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{AccessRight, Group};
use crate::transport::{CallOptions, RequestSpec};

pub(crate) mod wire {
    use super::*;

    pub fn create(base: &Url, name: &str, rights: AccessRight) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["group"])?;
        Ok(RequestSpec::post(url).json(json!({
            "name": name,
            "rights": rights,
        })))
    }

    pub fn update(base: &Url, group: &Group) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["group", &group.id])?;
        Ok(RequestSpec::patch(url).json(json!({
            "name": group.name,
            "rights": group.rights,
        })))
    }

    pub fn delete(base: &Url, group_id: &str, force: bool) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["group", group_id])?;
        Ok(RequestSpec::delete(url).param("force", force.to_string()))
    }

    pub fn list(base: &Url, admin: bool) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["group"])?;
        Ok(RequestSpec::get(url).param("admin", admin.to_string()))
    }

    pub fn get(base: &Url, group_id: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["group", group_id],
        )?))
    }

    pub fn join(base: &Url, group_id: &str, join_key: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["group", group_id, "join"])?;
        Ok(RequestSpec::post(url).param("joinKey", join_key))
    }

    pub fn leave(base: &Url, group_id: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["group", group_id, "leave"])?;
        Ok(RequestSpec::post(url))
    }

    pub fn add_user(base: &Url, group_id: &str, user_id: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["group", group_id, "user", "add"])?;
        Ok(RequestSpec::post(url).param("userToAddId", user_id))
    }

    /// Removing a user keeps their entities unless `force` is set.
    pub fn remove_user(
        base: &Url,
        group_id: &str,
        user_id: &str,
        force: bool,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["group", group_id, "user", "remove"])?;
        Ok(RequestSpec::post(url)
            .param("userToRemoveId", user_id)
            .param("force", force.to_string()))
    }

    pub fn add_entity(base: &Url, group_id: &str, entity_uri: &str) -> ServiceResult<RequestSpec> {
        let url =
            crate::transport::join_url(base, &["group", group_id, "entity", entity_uri, "add"])?;
        Ok(RequestSpec::post(url))
    }

    pub fn remove_entity(
        base: &Url,
        group_id: &str,
        entity_uri: &str,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(
            base,
            &["group", group_id, "entity", entity_uri, "remove"],
        )?;
        Ok(RequestSpec::post(url))
    }

    pub fn parse_group(value: &Value) -> ServiceResult<Group> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed group: {}", e), None))
    }

    pub fn parse_groups(value: &Value) -> ServiceResult<Vec<Group>> {
        let list = value.get("result").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed group list: {}", e), None))
    }
}

/// Async group client.
#[derive(Clone)]
pub struct GroupClient {
    pub(crate) base: ClientBase,
}

impl GroupClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            base: ClientBase::new(config)?,
        })
    }

    pub fn core(&self) -> &ClientBase {
        &self.base
    }

    pub fn core_mut(&mut self) -> &mut ClientBase {
        &mut self.base
    }

    async fn json(&self, spec: RequestSpec) -> ServiceResult<Value> {
        self.base
            .transport
            .execute_json(spec, self.base.auth()?, CallOptions::default())
            .await
    }

    async fn empty(&self, spec: RequestSpec) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(spec, self.base.auth()?, CallOptions::default())
            .await
    }

    /// Create a group; the response carries the join key.
    pub async fn create_group(&self, name: &str, rights: AccessRight) -> ServiceResult<Group> {
        let value = self.json(wire::create(&self.base.base, name, rights)?).await?;
        wire::parse_group(&value)
    }

    /// Rename a group or change its rights.
    pub async fn update_group(&self, group: &Group) -> ServiceResult<()> {
        self.empty(wire::update(&self.base.base, group)?).await
    }

    /// Delete a group; `force` cascades to its shared entities.
    pub async fn delete_group(&self, group_id: &str, force: bool) -> ServiceResult<()> {
        self.empty(wire::delete(&self.base.base, group_id, force)?).await
    }

    /// Groups of the caller; `admin` lists every group in the tenant.
    pub async fn listing_groups(&self, admin: bool) -> ServiceResult<Vec<Group>> {
        let value = self.json(wire::list(&self.base.base, admin)?).await?;
        wire::parse_groups(&value)
    }

    pub async fn group(&self, group_id: &str) -> ServiceResult<Group> {
        let value = self.json(wire::get(&self.base.base, group_id)?).await?;
        wire::parse_group(&value)
    }

    /// Join a group using its join key.
    pub async fn join_group(&self, group_id: &str, join_key: &str) -> ServiceResult<()> {
        self.empty(wire::join(&self.base.base, group_id, join_key)?).await
    }

    pub async fn leave_group(&self, group_id: &str) -> ServiceResult<()> {
        self.empty(wire::leave(&self.base.base, group_id)?).await
    }

    pub async fn add_user_to_group(&self, group_id: &str, user_id: &str) -> ServiceResult<()> {
        self.empty(wire::add_user(&self.base.base, group_id, user_id)?)
            .await
    }

    /// Remove a user; `force` also removes their shared entities.
    pub async fn remove_user_from_group(
        &self,
        group_id: &str,
        user_id: &str,
        force: bool,
    ) -> ServiceResult<()> {
        self.empty(wire::remove_user(&self.base.base, group_id, user_id, force)?)
            .await
    }

    /// Share an entity with a group.
    pub async fn add_entity_to_group(
        &self,
        group_id: &str,
        entity_uri: &str,
    ) -> ServiceResult<()> {
        self.empty(wire::add_entity(&self.base.base, group_id, entity_uri)?)
            .await
    }

    /// Unshare an entity from a group.
    pub async fn remove_entity_from_group(
        &self,
        group_id: &str,
        entity_uri: &str,
    ) -> ServiceResult<()> {
        self.empty(wire::remove_entity(&self.base.base, group_id, entity_uri)?)
            .await
    }
}

/// Blocking group client.
#[derive(Clone)]
pub struct BlockingGroupClient {
    pub(crate) base: BlockingClientBase,
}

impl BlockingGroupClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            base: BlockingClientBase::new(config)?,
        })
    }

    pub fn core(&self) -> &BlockingClientBase {
        &self.base
    }

    pub fn core_mut(&mut self) -> &mut BlockingClientBase {
        &mut self.base
    }

    fn json(&self, spec: RequestSpec) -> ServiceResult<Value> {
        self.base
            .transport
            .execute_json(spec, self.base.auth()?, CallOptions::default())
    }

    fn empty(&self, spec: RequestSpec) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(spec, self.base.auth()?, CallOptions::default())
    }

    pub fn create_group(&self, name: &str, rights: AccessRight) -> ServiceResult<Group> {
        let value = self.json(wire::create(&self.base.base, name, rights)?)?;
        wire::parse_group(&value)
    }

    pub fn update_group(&self, group: &Group) -> ServiceResult<()> {
        self.empty(wire::update(&self.base.base, group)?)
    }

    pub fn delete_group(&self, group_id: &str, force: bool) -> ServiceResult<()> {
        self.empty(wire::delete(&self.base.base, group_id, force)?)
    }

    pub fn listing_groups(&self, admin: bool) -> ServiceResult<Vec<Group>> {
        let value = self.json(wire::list(&self.base.base, admin)?)?;
        wire::parse_groups(&value)
    }

    pub fn group(&self, group_id: &str) -> ServiceResult<Group> {
        let value = self.json(wire::get(&self.base.base, group_id)?)?;
        wire::parse_group(&value)
    }

    pub fn join_group(&self, group_id: &str, join_key: &str) -> ServiceResult<()> {
        self.empty(wire::join(&self.base.base, group_id, join_key)?)
    }

    pub fn leave_group(&self, group_id: &str) -> ServiceResult<()> {
        self.empty(wire::leave(&self.base.base, group_id)?)
    }

    pub fn add_user_to_group(&self, group_id: &str, user_id: &str) -> ServiceResult<()> {
        self.empty(wire::add_user(&self.base.base, group_id, user_id)?)
    }

    pub fn remove_user_from_group(
        &self,
        group_id: &str,
        user_id: &str,
        force: bool,
    ) -> ServiceResult<()> {
        self.empty(wire::remove_user(&self.base.base, group_id, user_id, force)?)
    }

    pub fn add_entity_to_group(&self, group_id: &str, entity_uri: &str) -> ServiceResult<()> {
        self.empty(wire::add_entity(&self.base.base, group_id, entity_uri)?)
    }

    pub fn remove_entity_from_group(
        &self,
        group_id: &str,
        entity_uri: &str,
    ) -> ServiceResult<()> {
        self.empty(wire::remove_entity(&self.base.base, group_id, entity_uri)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_spec_carries_key_as_param() {
        let base = Url::parse("https://kg.example.com/graph/v1").unwrap();
        let spec = wire::join(&base, "g-1", "jk-secret").unwrap();
        assert!(spec.url.path().ends_with("/group/g-1/join"));
        assert!(spec
            .params
            .iter()
            .any(|(k, v)| k == "joinKey" && v == "jk-secret"));
    }

    #[test]
    fn remove_user_carries_force() {
        let base = Url::parse("https://kg.example.com/graph/v1").unwrap();
        let spec = wire::remove_user(&base, "g-1", "u-2", true).unwrap();
        assert!(spec.params.iter().any(|(k, v)| k == "force" && v == "true"));
    }
}
