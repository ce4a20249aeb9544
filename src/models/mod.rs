//! Domain model of the knowledge graph and its wire codec.

pub mod codec;
pub mod content;
pub mod document;
pub mod entity;
pub mod group;
pub mod iri;
pub mod job;
pub mod locale;
pub mod ontology;
pub mod property;
pub mod tenant;
pub mod user;

pub use content::{Description, Label, LocalizedContent};
pub use document::{
    DocumentMetadata, FilterMode, LabelMatch, LinkedEntityMention, VectorDocument,
};
pub use entity::{AccessRight, EntityStatus, IndexTarget, ThingObject, Visibility};
pub use group::Group;
pub use iri::{OntologyClassReference, OntologyPropertyReference};
pub use job::{ErrorLogPage, ImportErrorEntry, ImportJob, JobStatus, NewUrisPage};
pub use locale::{LanguageCode, LocaleCode, SupportedLocale};
pub use ontology::{
    InflectionSetting, OntologyClass, OntologyContext, OntologyInstance, OntologyProperty,
};
pub use property::{
    check_data_property_range, DataProperty, DataPropertyType, ObjectProperty, PropertyKind,
    RelationTarget,
};
pub use tenant::TenantConfiguration;
pub use user::{User, UserRole};
