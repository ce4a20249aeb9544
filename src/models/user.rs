//! Users: internal shadow identities for external user ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Role of a user inside its tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Admin,
    Content,
    TenantAdmin,
}

/// A user as the platform reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Internal id assigned by the platform.
    pub id: String,
    #[serde(rename = "externalUserId")]
    pub external_user_id: String,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<UserRole>,
    #[serde(rename = "metaData", default, skip_serializing_if = "HashMap::is_empty")]
    pub meta_data: HashMap<String, String>,
}
