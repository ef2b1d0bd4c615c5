//! Single-file component sources.
//!
//! This crate reads component files, splits them into their template, script,
//! style and localization sections, and models localization tables.

pub mod i18n;
pub mod sections;
pub mod source;

pub use i18n::{LocalizationError, LocalizationTable, Messages};
pub use sections::{
    extract_localization, extract_sections, ComponentSections, SectionError, SectionKind,
    EMPTY_LOCALIZATION,
};
pub use source::{stable_id, ComponentSource, COMPONENT_EXTENSION};
