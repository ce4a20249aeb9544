//! Localized content: labels and descriptions.

use serde::{Deserialize, Serialize};

use super::locale::LocaleCode;

/// Shared surface of every localized value.
pub trait LocalizedContent {
    fn content(&self) -> &str;
    fn locale(&self) -> &LocaleCode;
}

/// A display name for an entity in one locale.
///
/// `is_main` distinguishes the canonical label of a locale from its
/// aliases; the wire format carries both in one `labels` array and
/// splits them by this flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "value")]
    pub content: String,
    pub locale: LocaleCode,
    #[serde(rename = "isMain", default = "default_is_main")]
    pub is_main: bool,
}

fn default_is_main() -> bool {
    true
}

impl Label {
    pub fn new(content: impl Into<String>, locale: LocaleCode, is_main: bool) -> Self {
        Self {
            content: content.into(),
            locale,
            is_main,
        }
    }

    /// Canonical label for a locale.
    pub fn main(content: impl Into<String>, locale: LocaleCode) -> Self {
        Self::new(content, locale, true)
    }

    /// Alias label for a locale.
    pub fn alias(content: impl Into<String>, locale: LocaleCode) -> Self {
        Self::new(content, locale, false)
    }
}

impl LocalizedContent for Label {
    fn content(&self) -> &str {
        &self.content
    }

    fn locale(&self) -> &LocaleCode {
        &self.locale
    }
}

/// A description of an entity in one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "description")]
    pub content: String,
    pub locale: LocaleCode,
}

impl Description {
    pub fn new(content: impl Into<String>, locale: LocaleCode) -> Self {
        Self {
            content: content.into(),
            locale,
        }
    }
}

impl LocalizedContent for Description {
    fn content(&self) -> &str {
        &self.content
    }

    fn locale(&self) -> &LocaleCode {
        &self.locale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_wire_roundtrip() {
        let label = Label::main("Ada Lovelace", LocaleCode::en_us());
        let json = serde_json::to_value(&label).unwrap();
        assert_eq!(json["value"], "Ada Lovelace");
        assert_eq!(json["locale"], "en_US");
        assert_eq!(json["isMain"], true);
        let back: Label = serde_json::from_value(json).unwrap();
        assert_eq!(back, label);
    }

    #[test]
    fn alias_roundtrip() {
        let alias = Label::alias("Ada", LocaleCode::en_us());
        let back: Label = serde_json::from_value(serde_json::to_value(&alias).unwrap()).unwrap();
        assert!(!back.is_main);
        assert_eq!(back, alias);
    }

    #[test]
    fn description_wire_roundtrip() {
        let description = Description::new("First programmer", LocaleCode::en_us());
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["description"], "First programmer");
        let back: Description = serde_json::from_value(json).unwrap();
        assert_eq!(back, description);
    }

    #[test]
    fn missing_is_main_defaults_to_true() {
        let back: Label =
            serde_json::from_value(serde_json::json!({"value": "Ada", "locale": "en_US"}))
                .unwrap();
        assert!(back.is_main);
    }
}
