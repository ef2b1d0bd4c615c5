//! Localization export command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sfcpack_build::export_languages;

use super::config::load_config;

/// Run the i18n command.
pub async fn run(config_path: &Path, dir: Option<PathBuf>) -> Result<()> {
    tracing::info!("Exporting languages...");

    let config = load_config(config_path)?.i18n_config(dir);
    let result = export_languages(&config)?;

    tracing::info!(
        "Exported {} locales ({}) from {} components in {}ms",
        result.locales.len(),
        result.locales.join(", "),
        result.components,
        result.duration_ms
    );
    tracing::info!("Output: {}", config.json_dir.display());

    if !result.failures.is_empty() {
        for failure in &result.failures {
            tracing::error!("{}", failure);
        }
        anyhow::bail!(
            "{} of {} components have unreadable localization",
            result.failures.len(),
            result.components
        );
    }

    Ok(())
}
