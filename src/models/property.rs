//! Data and object properties.
//!
//! Data properties carry scalar values typed by XSD primitive IRIs;
//! object properties carry incoming/outgoing relations to other
//! entities by URI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::content::LocalizedContent;
use super::entity::ThingObject;
use super::iri::OntologyPropertyReference;
use super::locale::LocaleCode;
use crate::error::{ServiceError, ServiceResult};

/// XSD namespace used in full data-type IRIs.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

/// Whether an ontology property relates entities or carries literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    #[serde(rename = "objectProperty")]
    Object,
    #[serde(rename = "dataProperty")]
    Data,
}

macro_rules! xsd_types {
    ($(($variant:ident, $local:literal)),+ $(,)?) => {
        /// Recognized XSD primitive types for data-property values.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum DataPropertyType {
            $($variant),+
        }

        impl DataPropertyType {
            pub const ALL: &'static [DataPropertyType] = &[$(DataPropertyType::$variant),+];

            /// Local name inside the XSD namespace, e.g. `dateTime`.
            pub fn local_name(&self) -> &'static str {
                match self {
                    $(DataPropertyType::$variant => $local),+
                }
            }

            /// Full IRI form, e.g. `http://www.w3.org/2001/XMLSchema#string`.
            pub fn iri(&self) -> String {
                format!("{}{}", XSD_NAMESPACE, self.local_name())
            }

            /// Parse a full IRI or the short `xsd:`-prefixed form.
            ///
            /// Unknown type IRIs are rejected.
            pub fn parse(iri: &str) -> ServiceResult<Self> {
                let local = iri
                    .strip_prefix(XSD_NAMESPACE)
                    .or_else(|| iri.strip_prefix("xsd:"))
                    .unwrap_or(iri);
                match local {
                    $($local => Ok(DataPropertyType::$variant),)+
                    _ => Err(ServiceError::validation(format!(
                        "'{}' is not a recognized XSD data-property type",
                        iri
                    ))),
                }
            }
        }
    };
}

xsd_types![
    (String, "string"),
    (Boolean, "boolean"),
    (Decimal, "decimal"),
    (Integer, "integer"),
    (Float, "float"),
    (Double, "double"),
    (Date, "date"),
    (Time, "time"),
    (DateTime, "dateTime"),
    (DateTimeStamp, "dateTimeStamp"),
    (GYear, "gYear"),
    (GMonth, "gMonth"),
    (GDay, "gDay"),
    (GYearMonth, "gYearMonth"),
    (GMonthDay, "gMonthDay"),
    (Duration, "duration"),
    (YearMonthDuration, "yearMonthDuration"),
    (DayTimeDuration, "dayTimeDuration"),
    (Byte, "byte"),
    (Short, "short"),
    (Int, "int"),
    (Long, "long"),
    (UnsignedByte, "unsignedByte"),
    (UnsignedShort, "unsignedShort"),
    (UnsignedInt, "unsignedInt"),
    (UnsignedLong, "unsignedLong"),
    (PositiveInteger, "positiveInteger"),
    (NonNegativeInteger, "nonNegativeInteger"),
    (NegativeInteger, "negativeInteger"),
    (NonPositiveInteger, "nonPositiveInteger"),
    (HexBinary, "hexBinary"),
    (Base64Binary, "base64Binary"),
    (AnyUri, "anyURI"),
    (Language, "language"),
    (NormalizedString, "normalizedString"),
    (Token, "token"),
    (Nmtoken, "NMTOKEN"),
    (Name, "Name"),
    (NcName, "NCName"),
];

impl fmt::Display for DataPropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iri())
    }
}

impl FromStr for DataPropertyType {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DataPropertyType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.iri())
    }
}

impl<'de> Deserialize<'de> for DataPropertyType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DataPropertyType::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl DataPropertyType {
    /// Check that a lexical value is well-formed for this type.
    pub fn check_range(&self, value: &str) -> bool {
        use DataPropertyType::*;
        match self {
            String | NormalizedString | Token | Nmtoken | Name | NcName => true,
            Boolean => matches!(value, "true" | "false" | "0" | "1"),
            Decimal | Float | Double => value.parse::<f64>().is_ok(),
            Integer | Long => value.parse::<i64>().is_ok(),
            Int => value.parse::<i32>().is_ok(),
            Short => value.parse::<i16>().is_ok(),
            Byte => value.parse::<i8>().is_ok(),
            UnsignedLong => value.parse::<u64>().is_ok(),
            UnsignedInt => value.parse::<u32>().is_ok(),
            UnsignedShort => value.parse::<u16>().is_ok(),
            UnsignedByte => value.parse::<u8>().is_ok(),
            PositiveInteger => value.parse::<u64>().map(|v| v > 0).unwrap_or(false),
            NonNegativeInteger => value.parse::<u64>().is_ok(),
            NegativeInteger => value.parse::<i64>().map(|v| v < 0).unwrap_or(false),
            NonPositiveInteger => value.parse::<i64>().map(|v| v <= 0).unwrap_or(false),
            Date => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
            Time => chrono::NaiveTime::parse_from_str(value, "%H:%M:%S").is_ok()
                || chrono::NaiveTime::parse_from_str(value, "%H:%M:%S%.f").is_ok(),
            DateTime | DateTimeStamp => {
                chrono::DateTime::parse_from_rfc3339(value).is_ok()
                    || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
            }
            GYear => value.parse::<i32>().is_ok(),
            GMonth => value.parse::<u8>().map(|m| (1..=12).contains(&m)).unwrap_or(false),
            GDay => value.parse::<u8>().map(|d| (1..=31).contains(&d)).unwrap_or(false),
            GYearMonth => chrono::NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
                .is_ok(),
            GMonthDay => chrono::NaiveDate::parse_from_str(&format!("2000-{}", value), "%Y-%m-%d")
                .is_ok(),
            Duration | YearMonthDuration | DayTimeDuration => {
                value.starts_with('P') || value.starts_with("-P")
            }
            HexBinary => !value.is_empty() && hex::decode(value).is_ok(),
            Base64Binary => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.decode(value).is_ok()
            }
            AnyUri => url::Url::parse(value).is_ok() || !value.contains(char::is_whitespace),
            Language => {
                value.len() >= 2 && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            }
        }
    }
}

/// Check a value against an arbitrary data-type IRI.
///
/// Types outside the known XSD table pass unconditionally; the backend
/// owns validation for those.
pub fn check_data_property_range(type_iri: &str, value: &str) -> bool {
    match DataPropertyType::parse(type_iri) {
        Ok(data_type) => data_type.check_range(value),
        Err(_) => true,
    }
}

/// A scalar attribute value of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProperty {
    pub value: String,
    #[serde(rename = "literal")]
    pub property: OntologyPropertyReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<LocaleCode>,
    #[serde(rename = "dataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataPropertyType>,
}

impl DataProperty {
    pub fn new(
        value: impl Into<String>,
        property: OntologyPropertyReference,
        locale: Option<LocaleCode>,
    ) -> Self {
        Self {
            value: value.into(),
            property,
            locale,
            data_type: None,
        }
    }

    pub fn typed(
        value: impl Into<String>,
        property: OntologyPropertyReference,
        locale: Option<LocaleCode>,
        data_type: DataPropertyType,
    ) -> Self {
        Self {
            value: value.into(),
            property,
            locale,
            data_type: Some(data_type),
        }
    }

    /// True when the value is well-formed for the declared type.
    ///
    /// Untyped properties always pass.
    pub fn in_range(&self) -> bool {
        self.data_type
            .map(|t| t.check_range(&self.value))
            .unwrap_or(true)
    }
}

/// One endpoint of a relation: either a bare URI or, transiently on
/// responses, a fully inlined entity.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationTarget {
    Uri(String),
    Entity(Box<ThingObject>),
}

impl RelationTarget {
    /// Collapse to the wire form: the entity URI, or the source
    /// reference id for entities the backend has not assigned a URI yet.
    pub fn wire_id(&self) -> Option<String> {
        match self {
            RelationTarget::Uri(uri) => Some(uri.clone()),
            RelationTarget::Entity(entity) => entity
                .uri
                .clone()
                .or_else(|| entity.source_reference_id()),
        }
    }

    pub fn uri(&self) -> Option<&str> {
        match self {
            RelationTarget::Uri(uri) => Some(uri),
            RelationTarget::Entity(entity) => entity.uri.as_deref(),
        }
    }
}

impl From<&str> for RelationTarget {
    fn from(uri: &str) -> Self {
        RelationTarget::Uri(uri.to_string())
    }
}

impl From<String> for RelationTarget {
    fn from(uri: String) -> Self {
        RelationTarget::Uri(uri)
    }
}

/// Bidirectional relation slot of an entity for one ontology property.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectProperty {
    pub incoming: Vec<RelationTarget>,
    pub outgoing: Vec<RelationTarget>,
}

impl ObjectProperty {
    pub fn outgoing_to(targets: Vec<RelationTarget>) -> Self {
        Self {
            incoming: Vec::new(),
            outgoing: targets,
        }
    }

    /// Outgoing URIs in wire form, skipping inlined entities without ids.
    pub fn outgoing_ids(&self) -> Vec<String> {
        self.outgoing.iter().filter_map(|t| t.wire_id()).collect()
    }

    /// Incoming URIs in wire form.
    pub fn incoming_ids(&self) -> Vec<String> {
        self.incoming.iter().filter_map(|t| t.wire_id()).collect()
    }
}

/// At most one data-property entry per `(property, locale)` for the
/// reserved source-tracking properties.
pub(crate) fn dedup_key(property: &DataProperty) -> (String, Option<String>) {
    (
        property.property.iri(),
        property.locale.as_ref().map(|l| l.as_str().to_string()),
    )
}

impl LocalizedContent for DataProperty {
    fn content(&self) -> &str {
        &self.value
    }

    fn locale(&self) -> &LocaleCode {
        // Untyped callers only reach this through localized listings,
        // which always set a locale.
        self.locale.as_ref().expect("data property has no locale")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xsd_iri_roundtrip() {
        for data_type in DataPropertyType::ALL {
            assert_eq!(DataPropertyType::parse(&data_type.iri()).unwrap(), *data_type);
        }
    }

    #[test]
    fn xsd_short_form_parses() {
        assert_eq!(
            DataPropertyType::parse("xsd:dateTime").unwrap(),
            DataPropertyType::DateTime
        );
    }

    #[test]
    fn unknown_xsd_type_is_rejected() {
        assert!(DataPropertyType::parse("xsd:quaternion").is_err());
        assert!(DataPropertyType::parse("http://example.com/t#foo").is_err());
    }

    #[test]
    fn range_checks() {
        assert!(DataPropertyType::Boolean.check_range("true"));
        assert!(!DataPropertyType::Boolean.check_range("yes"));
        assert!(DataPropertyType::Integer.check_range("-42"));
        assert!(!DataPropertyType::Integer.check_range("4.2"));
        assert!(DataPropertyType::Decimal.check_range("4.2"));
        assert!(DataPropertyType::Date.check_range("1815-12-10"));
        assert!(!DataPropertyType::Date.check_range("10.12.1815"));
        assert!(DataPropertyType::DateTime.check_range("1815-12-10T12:00:00Z"));
        assert!(DataPropertyType::AnyUri.check_range("https://example.com/a"));
        assert!(!DataPropertyType::PositiveInteger.check_range("0"));
        assert!(DataPropertyType::NonPositiveInteger.check_range("0"));
        assert!(DataPropertyType::HexBinary.check_range("deadbeef"));
        assert!(!DataPropertyType::HexBinary.check_range("xyz"));
    }

    #[test]
    fn unknown_types_pass_range_check() {
        assert!(check_data_property_range("custom:vocab#molecule", "C8H10N4O2"));
        assert!(!check_data_property_range("xsd:integer", "abc"));
    }

    #[test]
    fn relation_target_collapses_to_uri() {
        let target = RelationTarget::from("wacom:entity:123");
        assert_eq!(target.wire_id().as_deref(), Some("wacom:entity:123"));
    }

    #[test]
    fn data_property_wire_shape() {
        let property = DataProperty::typed(
            "1815-12-10",
            OntologyPropertyReference::new("wacom", "core", "birthDate"),
            None,
            DataPropertyType::Date,
        );
        let json = serde_json::to_value(&property).unwrap();
        assert_eq!(json["value"], "1815-12-10");
        assert_eq!(json["literal"], "wacom:core#birthDate");
        assert_eq!(json["dataType"], "http://www.w3.org/2001/XMLSchema#date");
        let back: DataProperty = serde_json::from_value(json).unwrap();
        assert_eq!(back, property);
    }
}
