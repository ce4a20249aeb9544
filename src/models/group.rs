//! Groups: entity-sharing circles inside a tenant.

use serde::{Deserialize, Serialize};

use super::entity::AccessRight;

/// A sharing group.
///
/// `join_key` is present only for the group owner and for tenant
/// admins; regular members see it as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rights: AccessRight,
    #[serde(rename = "joinKey", default, skip_serializing_if = "Option::is_none")]
    pub join_key: Option<String>,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(rename = "ownerId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Internal user ids of the members, when the caller may see them.
    #[serde(rename = "userIds", default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<String>,
}
