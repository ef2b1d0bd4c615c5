//! Trait definitions for template compilers.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How component templates are turned into render code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Embed the raw template string; no external compiler involved
    #[default]
    Debug,
    /// Compile templates to render functions with the external compiler
    Release,
}

/// One component template to compile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileRequest {
    /// Component source path, used to match the response
    pub path: PathBuf,

    /// Stable identifier derived from the path
    pub id: String,

    /// Extracted template text
    pub template: String,
}

/// A batch of templates compiled in a single compiler invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileBatch {
    /// Production mode output
    pub production: bool,

    /// Keep template comments in the output
    pub comments: bool,

    /// Templates to compile
    pub components: Vec<CompileRequest>,
}

impl CompileBatch {
    /// Create a production batch with template comments stripped.
    pub fn new(components: Vec<CompileRequest>) -> Self {
        Self {
            production: true,
            comments: false,
            components,
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Per-component answer from a compiler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompileOutcome {
    pub path: PathBuf,

    /// Generated render module source
    #[serde(default)]
    pub code: Option<String>,

    /// Compiler diagnostics when the template failed to compile
    #[serde(default)]
    pub error: Option<String>,
}

impl CompileOutcome {
    pub fn code(path: impl Into<PathBuf>, code: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: Some(code.into()),
            error: None,
        }
    }

    pub fn error(path: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: None,
            error: Some(error.into()),
        }
    }
}

/// Render artifacts of a whole batch, keyed by component path.
///
/// Every request of the batch has an entry: either generated code or the
/// compiler's diagnostics for that component.
#[derive(Debug, Default)]
pub struct CompiledBatch {
    artifacts: HashMap<PathBuf, Result<String, String>>,
}

impl CompiledBatch {
    /// Match compiler outcomes against the batch they answer.
    ///
    /// A request without an outcome, or an outcome with neither code nor an
    /// error, fails the whole batch.
    pub fn from_outcomes(
        batch: &CompileBatch,
        outcomes: Vec<CompileOutcome>,
    ) -> Result<Self, CompilerError> {
        let mut by_path: HashMap<PathBuf, CompileOutcome> = outcomes
            .into_iter()
            .map(|outcome| (outcome.path.clone(), outcome))
            .collect();

        let mut artifacts = HashMap::with_capacity(batch.len());

        for request in &batch.components {
            let missing = || CompilerError::MissingArtifact(request.path.display().to_string());
            let outcome = by_path.remove(&request.path).ok_or_else(missing)?;

            let artifact = match (outcome.code, outcome.error) {
                (_, Some(error)) => Err(error),
                (Some(code), None) if !code.trim().is_empty() => Ok(code),
                _ => return Err(missing()),
            };

            artifacts.insert(request.path.clone(), artifact);
        }

        Ok(Self { artifacts })
    }

    /// Artifact for a component path.
    pub fn get(&self, path: &Path) -> Option<&Result<String, String>> {
        self.artifacts.get(path)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Errors that fail a whole compiler invocation.
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("Failed to prepare template compiler: {0}")]
    Setup(String),

    #[error("Failed to start template compiler `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("Template compiler I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template compiler timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Template compiler exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Invalid template compiler response: {0}")]
    InvalidResponse(String),

    #[error("Template compiler returned no artifact for {0}")]
    MissingArtifact(String),
}

/// A compiler turning component templates into render modules.
///
/// Implementations receive the whole batch of a build pass at once; the
/// result is all-or-nothing at the batch level.
pub trait TemplateCompiler: Send + Sync {
    /// Compiler identifier (e.g., "node")
    fn name(&self) -> &'static str;

    /// Compile every template of the batch.
    fn compile_batch(
        &self,
        batch: &CompileBatch,
    ) -> impl Future<Output = Result<CompiledBatch, CompilerError>> + Send;
}
