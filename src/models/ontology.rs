//! DTOs for the ontology service.
//!
//! The ontology engine itself is a remote service; these types mirror
//! the JSON it exchanges for contexts, classes and properties.

use serde::{Deserialize, Serialize};

use super::content::{Description, Label};
use super::iri::{OntologyClassReference, OntologyPropertyReference};
use super::property::PropertyKind;

/// Grammatical inflection configuration for a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflectionSetting {
    pub inflection: String,
    #[serde(rename = "caseSensitive", default)]
    pub case_sensitive: bool,
}

/// An ontology context: a named, versioned collection of classes and
/// properties owned by one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "baseUri", default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Description>,
    #[serde(
        rename = "inflectionSettings",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub inflection_settings: Vec<InflectionSetting>,
    /// Uncommitted staged changes exist for this context.
    #[serde(rename = "hasStagedChanges", default)]
    pub has_staged_changes: bool,
}

/// A class in the ontology, with its position in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyClass {
    #[serde(rename = "ref")]
    pub reference: OntologyClassReference,
    #[serde(
        rename = "subclassOf",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subclass_of: Option<OntologyClassReference>,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Description>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A property in the ontology with domains, ranges and links to
/// related properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyProperty {
    pub kind: PropertyKind,
    #[serde(rename = "ref")]
    pub reference: OntologyPropertyReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<OntologyClassReference>,
    /// Class IRIs for object properties, data-type IRIs for data
    /// properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<String>,
    #[serde(rename = "inverseOf", default, skip_serializing_if = "Option::is_none")]
    pub inverse_of: Option<OntologyPropertyReference>,
    #[serde(
        rename = "subPropertyOf",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub subproperty_of: Option<OntologyPropertyReference>,
    #[serde(
        rename = "superProperties",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub super_properties: Vec<OntologyPropertyReference>,
    #[serde(
        rename = "subProperties",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub sub_properties: Vec<OntologyPropertyReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Description>,
}

/// A named individual defined directly in the ontology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyInstance {
    pub iri: String,
    #[serde(rename = "classRef")]
    pub class_reference: OntologyClassReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Description>,
}
