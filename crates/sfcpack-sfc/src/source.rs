//! Component source files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// File extension of single-file components.
pub const COMPONENT_EXTENSION: &str = "vue";

/// A component source file read for one build pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSource {
    /// Path of the source file
    pub path: PathBuf,

    /// Raw file content
    pub content: String,
}

impl ComponentSource {
    /// Create a component source from already loaded content.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Read a component source from disk.
    pub fn read(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::new(path, content))
    }

    /// Component name: the file name with its extension stripped.
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("component")
    }

    /// File name used when reporting errors.
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Identifier derived from the path, stable across builds.
    pub fn stable_id(&self) -> String {
        stable_id(&self.path)
    }

    /// Path of a build output written beside the source (`Button.vue` -> `Button.vue.js`).
    pub fn output_path(&self, extension: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }
}

/// Hash a component path into an 8 character hex identifier.
pub fn stable_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}
