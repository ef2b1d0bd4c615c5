//! Component build command.

use std::path::Path;

use anyhow::Result;
use sfcpack_build::ComponentBuilder;

use super::config::{load_config, Overrides};

/// Run the build command.
pub async fn run(config_path: &Path, overrides: Overrides) -> Result<()> {
    tracing::info!("Building components...");

    let file_config = load_config(config_path)?;
    let config = file_config.build_config(overrides);
    let compiler = file_config.compiler();

    let result = ComponentBuilder::new(config, compiler).build().await?;

    tracing::info!(
        "Built {} components in {}ms ({} written, {} unchanged)",
        result.components,
        result.duration_ms,
        result.written,
        result.unchanged
    );

    if !result.is_success() {
        for failure in &result.failures {
            tracing::error!("{}", failure);
        }
        anyhow::bail!(
            "{} of {} components failed to build",
            result.failures.len(),
            result.components
        );
    }

    Ok(())
}
