//! Tenants: top-level multi-tenant boundaries.

use serde::{Deserialize, Serialize};

/// Configuration of a tenant as reported by the management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantConfiguration {
    pub id: String,
    pub name: String,
    /// API key; only present in the create response.
    #[serde(rename = "apiKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(
        rename = "ontologyName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ontology_name: Option<String>,
    #[serde(
        rename = "ontologyVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ontology_version: Option<String>,
    #[serde(rename = "isLocked", default)]
    pub is_locked: bool,
    /// Opaque vector-search configuration blob, passed through as-is.
    #[serde(
        rename = "vectorSearchConfig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vector_search_config: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_roundtrip() {
        let tenant = TenantConfiguration {
            id: "t-9".to_string(),
            name: "acme".to_string(),
            api_key: Some("key".to_string()),
            ontology_name: Some("core".to_string()),
            ontology_version: Some("3".to_string()),
            is_locked: false,
            vector_search_config: Some(serde_json::json!({"model": "default"})),
        };
        let back: TenantConfiguration =
            serde_json::from_value(serde_json::to_value(&tenant).unwrap()).unwrap();
        assert_eq!(back, tenant);
    }
}
