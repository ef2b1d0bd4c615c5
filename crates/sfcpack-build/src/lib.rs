//! Build orchestration for single-file components.
//!
//! Runs component build passes and exports consolidated localization tables.

pub mod assets;
pub mod builder;
pub mod i18n;
pub mod writer;

pub use builder::{
    discover_components, BuildConfig, BuildError, BuildResult, ComponentBuilder, ComponentError,
    ComponentFailure,
};
pub use i18n::{export_languages, ExportResult, I18nConfig, LocalizationAggregator};
pub use writer::{write_if_changed, WriteOutcome};
