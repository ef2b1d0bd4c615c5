//! Configuration file (sfcpack.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use sfcpack_build::{BuildConfig, I18nConfig};
use sfcpack_compiler::{BuildMode, NodeCompiler, RuntimeNames};

/// Relative paths in the file resolve against the directory holding it.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    /// Directory of the config file
    #[serde(skip)]
    pub base: PathBuf,
    pub components: ComponentsConfig,
    pub build: BuildSettings,
    pub runtime: RuntimeNames,
    pub i18n: I18nSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ComponentsConfig {
    pub dir: String,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            dir: "website/vue".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub mode: BuildMode,
    pub minify: bool,
    /// Working directory of the template compiler
    pub work_dir: String,
    /// Node.js executable
    pub node: String,
    /// Extra arguments for the executable
    pub node_args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            mode: BuildMode::Debug,
            minify: false,
            work_dir: ".sfcpack".to_string(),
            node: "node".to_string(),
            node_args: Vec::new(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct I18nSettings {
    /// Defaults to a `json` directory beside the component directory
    pub json_dir: Option<String>,
    /// Defaults to a `js` directory beside the component directory
    pub js_dir: Option<String>,
}

/// Command line flags that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub release: bool,
    pub minify: bool,
    pub dir: Option<PathBuf>,
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ConfigFile {
            base,
            ..Default::default()
        });
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.base = base;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

impl ConfigFile {
    fn resolve(&self, path: &str) -> PathBuf {
        self.base.join(path)
    }

    /// Component directory; a command line `dir` is taken as given.
    pub fn components_dir(&self, dir: Option<PathBuf>) -> PathBuf {
        dir.unwrap_or_else(|| self.resolve(&self.components.dir))
    }

    /// Build pass configuration with command line overrides applied.
    pub fn build_config(&self, overrides: Overrides) -> BuildConfig {
        BuildConfig {
            components_dir: self.components_dir(overrides.dir),
            mode: if overrides.release {
                BuildMode::Release
            } else {
                self.build.mode
            },
            minify: overrides.minify || self.build.minify,
            runtime: self.runtime.clone(),
        }
    }

    /// External template compiler for release builds.
    pub fn compiler(&self) -> NodeCompiler {
        NodeCompiler::new(self.resolve(&self.build.work_dir))
            .with_program(&self.build.node)
            .with_args(&self.build.node_args)
            .with_timeout(Duration::from_secs(self.build.timeout_secs))
    }

    /// Localization export configuration.
    pub fn i18n_config(&self, dir: Option<PathBuf>) -> I18nConfig {
        let components_dir = self.components_dir(dir);
        let sibling = |name: &str| {
            components_dir
                .parent()
                .map(|p| p.join(name))
                .unwrap_or_else(|| PathBuf::from(name))
        };

        I18nConfig {
            json_dir: self
                .i18n
                .json_dir
                .as_deref()
                .map(|dir| self.resolve(dir))
                .unwrap_or_else(|| sibling("json")),
            js_dir: Some(
                self.i18n
                    .js_dir
                    .as_deref()
                    .map(|dir| self.resolve(dir))
                    .unwrap_or_else(|| sibling("js")),
            ),
            components_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = load_config(&temp.path().join("sfcpack.toml")).unwrap();

        assert_eq!(config.components.dir, "website/vue");
        assert_eq!(config.build.mode, BuildMode::Debug);
        assert_eq!(config.build.timeout_secs, 120);
        assert_eq!(config.runtime, RuntimeNames::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sfcpack.toml");
        fs::write(
            &path,
            "[build]\nmode = \"release\"\n\n[runtime]\nnamespace = \"Runtime\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.build.mode, BuildMode::Release);
        assert_eq!(config.build.work_dir, ".sfcpack");
        assert_eq!(config.runtime.namespace, "Runtime");
        assert_eq!(config.runtime.hoisted_prefix, "r_itm_");
        assert_eq!(config.components.dir, "website/vue");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sfcpack.toml");
        fs::write(&path, "[build]\nmode = \"fast\"\n").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn flags_override_file() {
        let config = ConfigFile::default();

        let build = config.build_config(Overrides {
            release: true,
            minify: true,
            dir: Some(PathBuf::from("src/vue")),
        });

        assert_eq!(build.mode, BuildMode::Release);
        assert!(build.minify);
        assert_eq!(build.components_dir, PathBuf::from("src/vue"));
    }

    #[test]
    fn paths_resolve_against_the_config_directory() {
        let temp = tempdir().unwrap();
        let sub = temp.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        let path = sub.join("sfcpack.toml");
        fs::write(
            &path,
            "[components]\ndir = \"vue\"\n\n[i18n]\njson_dir = \"out/json\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let build = config.build_config(Overrides::default());
        let i18n = config.i18n_config(None);

        assert_eq!(build.components_dir, sub.join("vue"));
        assert_eq!(i18n.components_dir, sub.join("vue"));
        assert_eq!(i18n.json_dir, sub.join("out/json"));
        assert_eq!(i18n.js_dir, Some(sub.join("js")));
    }

    #[test]
    fn defaults_resolve_against_the_config_directory() {
        let config = load_config(Path::new("site/sfcpack.toml")).unwrap();

        assert_eq!(
            config.build_config(Overrides::default()).components_dir,
            PathBuf::from("site/website/vue")
        );
    }

    #[test]
    fn language_dirs_default_beside_components() {
        let config = ConfigFile::default();

        let i18n = config.i18n_config(None);

        assert_eq!(i18n.components_dir, PathBuf::from("website/vue"));
        assert_eq!(i18n.json_dir, PathBuf::from("website/json"));
        assert_eq!(i18n.js_dir, Some(PathBuf::from("website/js")));
    }
}
