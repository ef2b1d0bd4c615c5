//! Localization export.
//!
//! Collects the `<i18n>` sections of every component into one table and
//! writes it as consolidated and per-locale language files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use sfcpack_sfc::{extract_localization, ComponentSource, LocalizationTable};

use crate::builder::{
    discover_components, split_failures, BuildError, ComponentError, ComponentFailure,
};
use crate::writer::{write_if_changed, WriteOutcome};

/// Consolidated language file.
pub const LANGUAGES_JSON: &str = "languages.json";

/// Script projection of the consolidated table.
pub const LANGUAGES_JS: &str = "languages.js";

/// Global the script projection declares.
pub const LANGUAGES_GLOBAL: &str = "GLOBAL_Language";

/// Configuration for a localization export.
#[derive(Debug, Clone)]
pub struct I18nConfig {
    /// Component source root
    pub components_dir: PathBuf,

    /// Directory for `languages.json` and `language_<code>.json`
    pub json_dir: PathBuf,

    /// Directory for `languages.js`, skipped when unset
    pub js_dir: Option<PathBuf>,
}

/// Result of a localization export.
#[derive(Debug, Default)]
pub struct ExportResult {
    /// Number of components scanned
    pub components: usize,

    /// Locale codes in the consolidated table
    pub locales: Vec<String>,

    /// Language files written
    pub written: usize,

    /// Language files already up to date
    pub unchanged: usize,

    /// Components whose localization could not be read
    pub failures: Vec<ComponentFailure>,

    /// Total export time in milliseconds
    pub duration_ms: u64,
}

/// Merges component localization tables into one.
///
/// The first non-empty table fixes the initial locale set. Later components may
/// add locales; they are merged too and reported. Duplicate keys resolve to the
/// component added last.
#[derive(Debug, Default)]
pub struct LocalizationAggregator {
    table: LocalizationTable,
    locales: BTreeSet<String>,
}

impl LocalizationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the localization table of one component.
    pub fn add(&mut self, component: &str, table: &LocalizationTable) {
        if table.is_empty() {
            return;
        }

        let first = self.locales.is_empty();
        for locale in table.locales() {
            if self.locales.insert(locale.to_string()) && !first {
                tracing::warn!("{} introduces locale `{}`", component, locale);
            }
        }

        self.table.merge(table);
    }

    /// Locale codes seen so far, sorted.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(|l| l.as_str())
    }

    pub fn table(&self) -> &LocalizationTable {
        &self.table
    }

    pub fn into_table(self) -> LocalizationTable {
        self.table
    }
}

/// File name of the single-locale projection.
pub fn locale_file_name(locale: &str) -> String {
    format!("language_{}.json", locale)
}

/// Scan every component below `config.components_dir` and write the language files.
pub fn export_languages(config: &I18nConfig) -> Result<ExportResult, BuildError> {
    let start = Instant::now();

    let paths = discover_components(&config.components_dir)?;
    tracing::info!(
        "Collecting localization from {} components in {}",
        paths.len(),
        config.components_dir.display()
    );

    let mut failures = Vec::new();

    let tables: Vec<Result<(String, LocalizationTable), ComponentFailure>> = paths
        .par_iter()
        .map(|path| read_localization(path))
        .collect();

    // Merge order follows the sorted discovery order.
    let mut aggregator = LocalizationAggregator::new();
    for (component, table) in split_failures(tables, &mut failures) {
        tracing::debug!("Merging localization of {}", component);
        aggregator.add(&component, &table);
    }

    let mut result = ExportResult {
        components: paths.len(),
        locales: aggregator.locales().map(str::to_string).collect(),
        ..Default::default()
    };

    for outcome in write_language_files(aggregator.table(), config)? {
        match outcome {
            WriteOutcome::Written => result.written += 1,
            WriteOutcome::Unchanged => result.unchanged += 1,
        }
    }

    result.failures = failures;
    result.duration_ms = start.elapsed().as_millis() as u64;

    Ok(result)
}

/// Write the consolidated table and one projection per locale.
pub fn write_language_files(
    table: &LocalizationTable,
    config: &I18nConfig,
) -> Result<Vec<WriteOutcome>, BuildError> {
    let mut outcomes = Vec::new();

    let consolidated = pretty(table)?;
    outcomes.push(write(&config.json_dir.join(LANGUAGES_JSON), &consolidated)?);

    if let Some(js_dir) = &config.js_dir {
        let script = format!("const {} = {}\n", LANGUAGES_GLOBAL, consolidated.trim_end());
        outcomes.push(write(&js_dir.join(LANGUAGES_JS), &script)?);
    }

    for locale in table.locales() {
        let projection = pretty(&table.project(locale))?;
        outcomes.push(write(&config.json_dir.join(locale_file_name(locale)), &projection)?);
    }

    Ok(outcomes)
}

fn read_localization(path: &Path) -> Result<(String, LocalizationTable), ComponentFailure> {
    let fail = |e: ComponentError| ComponentFailure::new(path, e);

    let source = ComponentSource::read(path).map_err(|e| fail(ComponentError::Read(e)))?;
    let text = extract_localization(&source.content).map_err(|e| fail(e.into()))?;
    let table = LocalizationTable::parse(&text).map_err(|e| fail(e.into()))?;

    Ok((source.basename(), table))
}

fn pretty(table: &LocalizationTable) -> Result<String, BuildError> {
    Ok(format!("{}\n", table.to_json_pretty()?))
}

fn write(path: &Path, contents: &str) -> Result<WriteOutcome, BuildError> {
    write_if_changed(path, contents).map_err(|e| BuildError::WriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use sfcpack_sfc::LocalizationError;
    use std::fs;
    use tempfile::tempdir;

    fn component(i18n: &str) -> String {
        format!(
            "<template><p>{{{{ t('hi') }}}}</p></template>\n<script>export default {{}}</script>\n<i18n>\n{}\n</i18n>\n",
            i18n
        )
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    fn setup(components: &[(&str, String)]) -> (tempfile::TempDir, I18nConfig) {
        let temp = tempdir().unwrap();
        let vue = temp.path().join("vue");
        fs::create_dir_all(&vue).unwrap();
        for (name, content) in components {
            fs::write(vue.join(name), content).unwrap();
        }

        let config = I18nConfig {
            components_dir: vue,
            json_dir: temp.path().join("json"),
            js_dir: Some(temp.path().join("js")),
        };
        (temp, config)
    }

    #[test]
    fn exports_consolidated_and_per_locale_files() {
        let (_temp, config) = setup(&[
            ("Greeting.vue", component(r#"{"en":{"hi":"Hi"}}"#)),
            (
                "Farewell.vue",
                component(r#"{"en":{"bye":"Bye"}, "de":{"bye":"Tschüss"}}"#),
            ),
        ]);

        let result = export_languages(&config).unwrap();

        assert_eq!(result.components, 2);
        assert_eq!(result.locales, vec!["de", "en"]);
        assert_eq!(result.written, 4);
        assert!(result.failures.is_empty());

        assert_eq!(
            read_json(&config.json_dir.join("languages.json")),
            json!({ "en": { "hi": "Hi", "bye": "Bye" }, "de": { "bye": "Tschüss" } })
        );
        assert_eq!(
            read_json(&config.json_dir.join("language_en.json")),
            json!({ "en": { "hi": "Hi", "bye": "Bye" } })
        );
        assert_eq!(
            read_json(&config.json_dir.join("language_de.json")),
            json!({ "de": { "bye": "Tschüss" } })
        );

        let script = fs::read_to_string(config.js_dir.unwrap().join("languages.js")).unwrap();
        assert!(script.starts_with("const GLOBAL_Language = {\n"));
    }

    #[test]
    fn later_components_win_on_duplicate_keys() {
        let (_temp, config) = setup(&[
            ("A.vue", component(r#"{"en":{"ok":"OK","a":"A"}}"#)),
            ("B.vue", component(r#"{"en":{"ok":"Okay","b":"B"}}"#)),
        ]);

        export_languages(&config).unwrap();

        assert_eq!(
            read_json(&config.json_dir.join("language_en.json")),
            json!({ "en": { "ok": "Okay", "a": "A", "b": "B" } })
        );
    }

    #[test]
    fn output_does_not_depend_on_key_order() {
        let (_a, first) = setup(&[("A.vue", component(r#"{"en":{"x":"1","y":"2"}}"#))]);
        let (_b, second) = setup(&[("A.vue", component(r#"{"en":{"y":"2","x":"1"}}"#))]);

        export_languages(&first).unwrap();
        export_languages(&second).unwrap();

        assert_eq!(
            fs::read_to_string(first.json_dir.join("languages.json")).unwrap(),
            fs::read_to_string(second.json_dir.join("languages.json")).unwrap()
        );
    }

    #[test]
    fn malformed_localization_is_reported_and_skipped() {
        let (_temp, config) = setup(&[
            ("Bad.vue", component(r#"{"en": "#)),
            ("Good.vue", component(r#"{"en":{"hi":"Hi"}}"#)),
        ]);

        let result = export_languages(&config).unwrap();

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].component, "Bad.vue");
        assert_eq!(
            read_json(&config.json_dir.join("languages.json")),
            json!({ "en": { "hi": "Hi" } })
        );
    }

    #[test]
    fn path_like_locale_codes_are_rejected() {
        let (temp, config) = setup(&[
            ("Escape.vue", component(r#"{"../x":{"hi":"Hi"}}"#)),
            ("Good.vue", component(r#"{"en":{"hi":"Hi"}}"#)),
        ]);

        let result = export_languages(&config).unwrap();

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].component, "Escape.vue");
        assert!(matches!(
            result.failures[0].error,
            ComponentError::Localization(LocalizationError::InvalidLocale(_))
        ));
        assert_eq!(result.locales, vec!["en"]);
        assert!(!temp.path().join("language_../x.json").exists());
        assert!(!temp.path().join("x.json").exists());
    }

    #[test]
    fn components_without_localization_are_ignored() {
        let (_temp, mut config) = setup(&[(
            "Plain.vue",
            "<template><p/></template><script>export default {}</script>".to_string(),
        )]);
        config.js_dir = None;

        let result = export_languages(&config).unwrap();

        assert!(result.locales.is_empty());
        assert_eq!(result.written, 1);
        assert_eq!(
            fs::read_to_string(config.json_dir.join("languages.json")).unwrap(),
            "{}\n"
        );
    }

    #[test]
    fn second_export_is_unchanged() {
        let (_temp, config) = setup(&[("A.vue", component(r#"{"en":{"hi":"Hi"}}"#))]);

        let first = export_languages(&config).unwrap();
        let second = export_languages(&config).unwrap();

        assert_eq!((first.written, first.unchanged), (3, 0));
        assert_eq!((second.written, second.unchanged), (0, 3));
    }

    #[test]
    fn aggregator_unions_locales() {
        let mut aggregator = LocalizationAggregator::new();
        aggregator.add("A.vue", &LocalizationTable::parse(r#"{"en":{"hi":"Hi"}}"#).unwrap());
        aggregator.add("Empty.vue", &LocalizationTable::new());
        aggregator.add(
            "B.vue",
            &LocalizationTable::parse(r#"{"de":{"hi":"Hallo"}}"#).unwrap(),
        );

        assert_eq!(aggregator.locales().collect::<Vec<_>>(), vec!["de", "en"]);
        assert_eq!(
            aggregator.into_table(),
            LocalizationTable::parse(r#"{"en":{"hi":"Hi"},"de":{"hi":"Hallo"}}"#).unwrap()
        );
    }
}
