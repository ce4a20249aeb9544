//! Ontology references: `scheme:context#name` qualified names.
//!
//! Class and property references share the same parsed shape but are
//! nominally distinct types; mixing them up is a compile error, not a
//! runtime surprise.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Scheme used by the platform's built-in vocabulary.
pub const SYSTEM_SCHEME: &str = "wacom";
/// Context of the platform's built-in vocabulary.
pub const CORE_CONTEXT: &str = "core";

/// Split a qualified IRI into `(scheme, context, name)`.
///
/// Requires exactly one `:` before exactly one `#`.
fn split_iri(iri: &str) -> ServiceResult<(&str, &str, &str)> {
    let colon = iri.find(':').ok_or_else(|| {
        ServiceError::validation(format!("IRI '{}' is missing the ':' separator", iri))
    })?;
    let hash = iri.find('#').ok_or_else(|| {
        ServiceError::validation(format!("IRI '{}' is missing the '#' separator", iri))
    })?;
    if hash < colon {
        return Err(ServiceError::validation(format!(
            "IRI '{}' has '#' before ':'",
            iri
        )));
    }
    let scheme = &iri[..colon];
    let context = &iri[colon + 1..hash];
    let name = &iri[hash + 1..];
    if scheme.is_empty() || context.is_empty() || name.is_empty() {
        return Err(ServiceError::validation(format!(
            "IRI '{}' has an empty scheme, context or name",
            iri
        )));
    }
    Ok((scheme, context, name))
}

macro_rules! ontology_reference {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            scheme: String,
            context: String,
            name: String,
        }

        impl $name {
            /// Build a reference from its parts.
            pub fn new(
                scheme: impl Into<String>,
                context: impl Into<String>,
                name: impl Into<String>,
            ) -> Self {
                Self {
                    scheme: scheme.into(),
                    context: context.into(),
                    name: name.into(),
                }
            }

            /// Parse a `scheme:context#name` IRI.
            pub fn parse(iri: &str) -> ServiceResult<Self> {
                let (scheme, context, name) = split_iri(iri)?;
                Ok(Self::new(scheme, context, name))
            }

            /// Canonical IRI form `scheme:context#name`.
            pub fn iri(&self) -> String {
                format!("{}:{}#{}", self.scheme, self.context, self.name)
            }

            pub fn scheme(&self) -> &str {
                &self.scheme
            }

            pub fn context(&self) -> &str {
                &self.context
            }

            pub fn name(&self) -> &str {
                &self.name
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}#{}", self.scheme, self.context, self.name)
            }
        }

        impl FromStr for $name {
            type Err = ServiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.iri())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct IriVisitor;

                impl<'de> Visitor<'de> for IriVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str("an IRI of the form scheme:context#name")
                    }

                    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                        $name::parse(value).map_err(|e| E::custom(e.to_string()))
                    }
                }

                deserializer.deserialize_str(IriVisitor)
            }
        }
    };
}

ontology_reference! {
    /// Reference to an ontology class, e.g. `wacom:core#Person`.
    OntologyClassReference
}

ontology_reference! {
    /// Reference to an ontology property, e.g. `wacom:core#firstName`.
    OntologyPropertyReference
}

impl OntologyClassReference {
    /// Root class of every entity: `wacom:core#Thing`.
    pub fn thing() -> Self {
        Self::new(SYSTEM_SCHEME, CORE_CONTEXT, "Thing")
    }
}

impl OntologyPropertyReference {
    /// Reserved property carrying the external source system of an entity.
    pub fn source_system() -> Self {
        Self::new(SYSTEM_SCHEME, CORE_CONTEXT, "sourceSystem")
    }

    /// Reserved property carrying the external source reference id.
    pub fn source_reference_id() -> Self {
        Self::new(SYSTEM_SCHEME, CORE_CONTEXT, "sourceReferenceId")
    }
}
