//! Locale and language tags.
//!
//! The platform addresses localized content by locale code
//! (`en_US`-style) while some services, the named-entity linker among
//! them, speak bare language codes (`en`). Two fixed tables map between
//! the two for the supported languages.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

fn locale_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[a-z]{2}_[A-Z]{2}$").expect("valid locale pattern"))
}

fn language_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[a-z]{2}$").expect("valid language pattern"))
}

/// Locale tag of the form `<lang>_<COUNTRY>`, e.g. `en_US`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Validate and wrap a locale tag.
    pub fn new(tag: impl Into<String>) -> ServiceResult<Self> {
        let tag = tag.into();
        if !locale_pattern().is_match(&tag) {
            return Err(ServiceError::validation(format!(
                "'{}' is not a locale of the form ll_CC",
                tag
            )));
        }
        Ok(LocaleCode(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bare language part of the tag.
    pub fn language(&self) -> LanguageCode {
        LanguageCode(self.0[..2].to_string())
    }

    pub fn en_us() -> Self {
        LocaleCode("en_US".to_string())
    }

    pub fn ja_jp() -> Self {
        LocaleCode("ja_JP".to_string())
    }

    pub fn de_de() -> Self {
        LocaleCode("de_DE".to_string())
    }

    pub fn bg_bg() -> Self {
        LocaleCode("bg_BG".to_string())
    }

    pub fn it_it() -> Self {
        LocaleCode("it_IT".to_string())
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LocaleCode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LocaleCode {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LocaleCode> for String {
    fn from(value: LocaleCode) -> Self {
        value.0
    }
}

/// Bare language tag, e.g. `en`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(tag: impl Into<String>) -> ServiceResult<Self> {
        let tag = tag.into();
        if !language_pattern().is_match(&tag) {
            return Err(ServiceError::validation(format!(
                "'{}' is not a two-letter language tag",
                tag
            )));
        }
        Ok(LanguageCode(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageCode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LanguageCode> for String {
    fn from(value: LanguageCode) -> Self {
        value.0
    }
}

/// Locales with full platform support (content authoring, NEL, search).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedLocale {
    EnUs,
    JaJp,
    DeDe,
    BgBg,
    ItIt,
}

impl SupportedLocale {
    pub const ALL: [SupportedLocale; 5] = [
        SupportedLocale::EnUs,
        SupportedLocale::JaJp,
        SupportedLocale::DeDe,
        SupportedLocale::BgBg,
        SupportedLocale::ItIt,
    ];

    pub fn locale_code(&self) -> LocaleCode {
        match self {
            SupportedLocale::EnUs => LocaleCode::en_us(),
            SupportedLocale::JaJp => LocaleCode::ja_jp(),
            SupportedLocale::DeDe => LocaleCode::de_de(),
            SupportedLocale::BgBg => LocaleCode::bg_bg(),
            SupportedLocale::ItIt => LocaleCode::it_it(),
        }
    }

    pub fn language_code(&self) -> LanguageCode {
        self.locale_code().language()
    }

    pub fn from_locale_code(code: &LocaleCode) -> Option<Self> {
        SupportedLocale::ALL
            .into_iter()
            .find(|s| &s.locale_code() == code)
    }
}

/// `language -> locale` pairs, supported languages first, then the
/// additional codes accepted on input only.
const LANGUAGE_LOCALE_TABLE: [(&str, &str); 16] = [
    ("en", "en_US"),
    ("ja", "ja_JP"),
    ("de", "de_DE"),
    ("bg", "bg_BG"),
    ("it", "it_IT"),
    ("es", "es_ES"),
    ("fr", "fr_FR"),
    ("pt", "pt_PT"),
    ("da", "da_DK"),
    ("nl", "nl_NL"),
    ("sv", "sv_SE"),
    ("nb", "nb_NO"),
    ("fi", "fi_FI"),
    ("ru", "ru_RU"),
    ("zh", "zh_CN"),
    ("ko", "ko_KR"),
];

/// Locale for a bare language tag, per the fixed mapping table.
pub fn locale_for_language(language: &LanguageCode) -> Option<LocaleCode> {
    LANGUAGE_LOCALE_TABLE
        .iter()
        .find(|(lang, _)| *lang == language.as_str())
        .map(|(_, locale)| LocaleCode((*locale).to_string()))
}

/// Language for a locale tag, per the fixed mapping table.
pub fn language_for_locale(locale: &LocaleCode) -> Option<LanguageCode> {
    LANGUAGE_LOCALE_TABLE
        .iter()
        .find(|(_, loc)| *loc == locale.as_str())
        .map(|(lang, _)| LanguageCode((*lang).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_validation() {
        assert!(LocaleCode::new("en_US").is_ok());
        assert!(LocaleCode::new("ja_JP").is_ok());
        assert!(LocaleCode::new("en-US").is_err());
        assert!(LocaleCode::new("EN_us").is_err());
        assert!(LocaleCode::new("english").is_err());
        assert!(LocaleCode::new("e_US").is_err());
    }

    #[test]
    fn language_extraction() {
        let locale = LocaleCode::new("de_DE").unwrap();
        assert_eq!(locale.language().as_str(), "de");
    }

    #[test]
    fn mapping_tables_are_inverse_for_supported_locales() {
        for supported in SupportedLocale::ALL {
            let locale = supported.locale_code();
            let language = language_for_locale(&locale).unwrap();
            assert_eq!(locale_for_language(&language), Some(locale));
        }
    }

    #[test]
    fn input_only_locales_resolve() {
        let locale = LocaleCode::new("sv_SE").unwrap();
        assert_eq!(language_for_locale(&locale).unwrap().as_str(), "sv");
        assert_eq!(SupportedLocale::from_locale_code(&locale), None);
    }

    #[test]
    fn serde_rejects_malformed_locales() {
        assert!(serde_json::from_str::<LocaleCode>("\"en_US\"").is_ok());
        assert!(serde_json::from_str::<LocaleCode>("\"en-US\"").is_err());
    }
}
