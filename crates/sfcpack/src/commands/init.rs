//! Initialize a component project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::config::load_config;

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing sfcpack...");

    init_project(config_path, yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sfcpack build' to compile your components.");

    Ok(())
}

/// Write the default config and an example component, keeping existing files unless `yes`.
fn init_project(config_path: &Path, yes: bool) -> Result<()> {
    if !config_path.exists() || yes {
        fs::write(config_path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        tracing::info!("Created {}", config_path.display());
    } else {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
    }

    let components_dir = load_config(config_path)?.components_dir(None);

    if !components_dir.exists() {
        fs::create_dir_all(&components_dir).context("Failed to create components directory")?;
    }

    let example_path = components_dir.join("HelloWorld.vue");
    if !example_path.exists() || yes {
        fs::write(&example_path, DEFAULT_COMPONENT).context("Failed to write HelloWorld.vue")?;
        tracing::info!("Created {}", example_path.display());
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# sfcpack configuration
# Relative paths resolve against the directory of this file.

[components]
# Directory containing your .vue components
dir = "website/vue"

[build]
# "debug" embeds templates as strings, "release" compiles them to render functions
mode = "debug"

# Also write minified stylesheets (<Component>.vue.min.css)
minify = false

# Working directory and executable for the template compiler (release mode)
work_dir = ".sfcpack"
node = "node"
node_args = []
timeout_secs = 120

[runtime]
# Globals the generated modules expect from the host page
register = "app.component"
namespace = "Vue"
use_i18n = "VueI18n.useI18n"
i18n_global = "i18n.global"
hoisted_prefix = "r_itm_"

[i18n]
# Output directories of `sfcpack i18n`
json_dir = "website/json"
js_dir = "website/js"
"#;

const DEFAULT_COMPONENT: &str = r#"<template>
  <div class="hello-world">
    <h1>{{ t('title') }}</h1>
    <button @click="count++">{{ t('clicked', { count }) }}</button>
  </div>
</template>

<script>
export default {
  data() {
    return {
      count: 0
    }
  }
}
</script>

<style>
.hello-world {
  font-family: sans-serif;
  text-align: center;
}
</style>

<i18n>
{
  "en": {
    "title": "Hello World",
    "clicked": "Clicked {count} times"
  },
  "de": {
    "title": "Hallo Welt",
    "clicked": "{count} mal geklickt"
  }
}
</i18n>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::config::Overrides;
    use sfcpack_sfc::{extract_sections, LocalizationTable};
    use tempfile::tempdir;

    #[test]
    fn writes_config_and_example_component() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("sfcpack.toml");

        init_project(&config_path, false).unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.components.dir, "website/vue");

        let example = temp.path().join("website/vue/HelloWorld.vue");
        let sections = extract_sections(&fs::read_to_string(example).unwrap()).unwrap();
        assert!(sections.script_members().is_ok());
        let table = LocalizationTable::parse(&sections.localization).unwrap();
        assert_eq!(table.locales().collect::<Vec<_>>(), vec!["de", "en"]);
    }

    #[test]
    fn keeps_existing_files_without_yes() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("sfcpack.toml");
        fs::write(&config_path, "[components]\ndir = \"vue\"\n").unwrap();

        init_project(&config_path, false).unwrap();

        assert_eq!(
            fs::read_to_string(&config_path).unwrap(),
            "[components]\ndir = \"vue\"\n"
        );
        assert!(temp.path().join("vue/HelloWorld.vue").exists());
    }

    #[test]
    fn init_and_build_agree_on_the_component_dir() {
        let temp = tempdir().unwrap();
        let sub = temp.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        let config_path = sub.join("sfcpack.toml");

        init_project(&config_path, false).unwrap();

        let build = load_config(&config_path)
            .unwrap()
            .build_config(Overrides::default());
        assert_eq!(build.components_dir, sub.join("website/vue"));
        assert!(build.components_dir.join("HelloWorld.vue").exists());
    }

    #[test]
    fn overwrites_with_yes() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("sfcpack.toml");
        fs::write(&config_path, "").unwrap();

        init_project(&config_path, true).unwrap();

        assert_eq!(fs::read_to_string(&config_path).unwrap(), DEFAULT_CONFIG);
    }
}
