//! Localization tables.
//!
//! The `<i18n>` section of a component is a JSON object keyed by locale code, each
//! value mapping message keys to localized strings:
//!
//! ```json
//! { "en": { "hello": "Hello" }, "de": { "hello": "Hallo" } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages of a single locale, keyed by message key.
pub type Messages = BTreeMap<String, Value>;

/// Mapping from locale code to messages.
///
/// Keys are kept sorted so serialized tables do not depend on source key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizationTable {
    locales: BTreeMap<String, Messages>,
}

/// Errors that can occur when parsing a localization section.
#[derive(Debug, thiserror::Error)]
pub enum LocalizationError {
    #[error("Invalid localization JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid locale code `{0}`")]
    InvalidLocale(String),

    #[error("Failed to serialize localization table: {0}")]
    Serialize(String),
}

impl LocalizationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse localization section text.
    ///
    /// Locale codes name the per-locale language files, so codes that are not a
    /// plain file name part are rejected.
    pub fn parse(text: &str) -> Result<Self, LocalizationError> {
        let table: Self =
            serde_json::from_str(text).map_err(|e| LocalizationError::InvalidJson(e.to_string()))?;

        if let Some(locale) = table.locales().find(|locale| !is_valid_locale(locale)) {
            return Err(LocalizationError::InvalidLocale(locale.to_string()));
        }

        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    /// Locale codes in sorted order.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(|k| k.as_str())
    }

    /// Messages for a locale.
    pub fn messages(&self, locale: &str) -> Option<&Messages> {
        self.locales.get(locale)
    }

    /// Insert a single message, replacing any previous value.
    pub fn insert(&mut self, locale: &str, key: &str, value: impl Into<Value>) {
        self.locales
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Merge another table into this one. Values from `other` win on duplicate keys.
    pub fn merge(&mut self, other: &LocalizationTable) {
        for (locale, messages) in &other.locales {
            let target = self.locales.entry(locale.clone()).or_default();
            for (key, value) in messages {
                target.insert(key.clone(), value.clone());
            }
        }
    }

    /// A table holding only one locale.
    pub fn project(&self, locale: &str) -> LocalizationTable {
        let mut locales = BTreeMap::new();
        if let Some(messages) = self.locales.get(locale) {
            locales.insert(locale.to_string(), messages.clone());
        }
        LocalizationTable { locales }
    }

    /// Pretty-printed JSON text.
    pub fn to_json_pretty(&self) -> Result<String, LocalizationError> {
        serde_json::to_string_pretty(self).map_err(|e| LocalizationError::Serialize(e.to_string()))
    }
}

fn is_valid_locale(locale: &str) -> bool {
    !locale.is_empty()
        && locale != "."
        && locale != ".."
        && !locale.contains(|c| c == '/' || c == '\\')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_locales() {
        let table = LocalizationTable::parse(
            r#"{ "en": { "hi": "Hi" }, "de": { "hi": "Hallo", "bye": "Tschüss" } }"#,
        )
        .unwrap();

        assert_eq!(table.locales().collect::<Vec<_>>(), vec!["de", "en"]);
        assert_eq!(table.messages("de").unwrap().len(), 2);
        assert_eq!(table.messages("en").unwrap()["hi"], json!("Hi"));
    }

    #[test]
    fn empty_object_is_empty_table() {
        let table = LocalizationTable::parse("{}").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            LocalizationTable::parse(r#"{ "en": { "hi": "Hi" "#),
            Err(LocalizationError::InvalidJson(_))
        ));
        assert!(matches!(
            LocalizationTable::parse(r#"{ "en": "Hi" }"#),
            Err(LocalizationError::InvalidJson(_))
        ));
        assert!(matches!(
            LocalizationTable::parse("[]"),
            Err(LocalizationError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_locale_codes_that_are_not_file_name_parts() {
        for text in [
            r#"{ "../x": { "hi": "Hi" } }"#,
            r#"{ "en/US": { "hi": "Hi" } }"#,
            r#"{ "en\\US": { "hi": "Hi" } }"#,
            r#"{ "..": {} }"#,
            r#"{ "": {} }"#,
        ] {
            assert!(
                matches!(LocalizationTable::parse(text), Err(LocalizationError::InvalidLocale(_))),
                "{}",
                text
            );
        }

        assert!(LocalizationTable::parse(r#"{ "pt-BR": {}, "zh_Hant": {} }"#).is_ok());
    }

    #[test]
    fn merge_unions_keys_and_later_wins() {
        let mut table = LocalizationTable::parse(r#"{"en": {"hi": "Hi", "ok": "OK"}}"#).unwrap();
        let other =
            LocalizationTable::parse(r#"{"en": {"ok": "Okay", "bye": "Bye"}, "de": {"bye": "Tschüss"}}"#)
                .unwrap();

        table.merge(&other);

        let en = table.messages("en").unwrap();
        assert_eq!(en.len(), 3);
        assert_eq!(en["ok"], json!("Okay"));
        assert_eq!(table.messages("de").unwrap()["bye"], json!("Tschüss"));
    }

    #[test]
    fn merge_is_idempotent() {
        let other = LocalizationTable::parse(r#"{"en": {"hi": "Hi"}}"#).unwrap();
        let mut table = LocalizationTable::new();

        table.merge(&other);
        let once = table.clone();
        table.merge(&other);

        assert_eq!(table, once);
    }

    #[test]
    fn projects_single_locale() {
        let mut table = LocalizationTable::new();
        table.insert("en", "hi", "Hi");
        table.insert("de", "hi", "Hallo");

        let de = table.project("de");

        assert_eq!(de.locales().collect::<Vec<_>>(), vec!["de"]);
        assert_eq!(
            de.to_json_pretty().unwrap(),
            "{\n  \"de\": {\n    \"hi\": \"Hallo\"\n  }\n}"
        );
        assert!(table.project("fr").is_empty());
    }
}
