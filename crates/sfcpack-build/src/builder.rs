//! Component build pass.
//!
//! One pass runs every component through
//! `Extracted -> (Rendered | TemplateEmbedded) -> Reconciled -> Assembled -> Written`.
//! Extraction runs in parallel. In release mode all templates then go to the
//! external compiler in a single batch, and the import set of every returned
//! artifact is collected before any component is reconciled. Reconciliation,
//! assembly and writing run in parallel again.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;

use sfcpack_compiler::{
    ArtifactError, AssembleError, BuildMode, CompileBatch, CompileRequest, CompilerError,
    GlobalImportSet, ModuleAssembler, Reconciler, RenderArtifact, RenderAttachment, RuntimeNames,
    TemplateCompiler,
};
use sfcpack_sfc::{
    extract_sections, ComponentSections, ComponentSource, LocalizationError, LocalizationTable,
    SectionError, COMPONENT_EXTENSION,
};

use crate::assets::minify_css;
use crate::writer::{write_if_changed, WriteOutcome};

/// Configuration for a build pass.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Component source root
    pub components_dir: PathBuf,

    /// Embed templates (debug) or compile them to render functions (release)
    pub mode: BuildMode,

    /// Also write minified stylesheets
    pub minify: bool,

    /// Names the generated modules expect from their host page
    pub runtime: RuntimeNames,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            components_dir: PathBuf::from("website/vue"),
            mode: BuildMode::Debug,
            minify: false,
            runtime: RuntimeNames::default(),
        }
    }
}

/// Result of a build pass.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Number of components discovered
    pub components: usize,

    /// Output files written
    pub written: usize,

    /// Output files already up to date
    pub unchanged: usize,

    /// Components that failed to build
    pub failures: Vec<ComponentFailure>,

    /// Total build time in milliseconds
    pub duration_ms: u64,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors that abort a whole build pass.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Components directory not found: {0}")]
    ComponentsDirNotFound(String),

    #[error("Failed to read components directory: {0}")]
    ReadError(String),

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Localization(#[from] LocalizationError),

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors that abort a single component.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("Failed to read source: {0}")]
    Read(#[source] io::Error),

    #[error(transparent)]
    Section(#[from] SectionError),

    #[error(transparent)]
    Localization(#[from] LocalizationError),

    #[error("Template compilation failed: {0}")]
    Compile(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A component that failed, named by its file basename.
#[derive(Debug, thiserror::Error)]
#[error("{component}: {error}")]
pub struct ComponentFailure {
    pub component: String,
    pub path: PathBuf,
    #[source]
    pub error: ComponentError,
}

impl ComponentFailure {
    pub fn new(path: &Path, error: impl Into<ComponentError>) -> Self {
        let component = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            component,
            path: path.to_path_buf(),
            error: error.into(),
        }
    }
}

/// A component whose sections passed validation.
#[derive(Debug)]
struct ExtractedComponent {
    source: ComponentSource,
    sections: ComponentSections,
    members: String,
    localization: LocalizationTable,
}

/// Discover component sources below `dir`, sorted by path.
pub fn discover_components(dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    if !dir.is_dir() {
        return Err(BuildError::ComponentsDirNotFound(dir.display().to_string()));
    }

    let mut paths = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| BuildError::ReadError(e.to_string()))?;
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) != Some(COMPONENT_EXTENSION) {
            continue;
        }

        tracing::debug!("Found component {}", path.display());
        paths.push(path.to_path_buf());
    }

    paths.sort();
    Ok(paths)
}

/// Move failed results into `failures`, keeping the successes in order.
pub(crate) fn split_failures<T>(
    results: Vec<Result<T, ComponentFailure>>,
    failures: &mut Vec<ComponentFailure>,
) -> Vec<T> {
    let mut ok = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(value) => ok.push(value),
            Err(failure) => {
                tracing::warn!("{}", failure);
                failures.push(failure);
            }
        }
    }
    ok
}

/// Builds every component of a directory.
pub struct ComponentBuilder<C> {
    config: BuildConfig,
    compiler: C,
    reconciler: Reconciler,
    assembler: ModuleAssembler,
}

impl<C: TemplateCompiler> ComponentBuilder<C> {
    /// Create a builder using `compiler` for release builds.
    pub fn new(config: BuildConfig, compiler: C) -> Self {
        let reconciler = config.runtime.reconciler();
        let assembler = ModuleAssembler::new(config.runtime.clone());

        Self {
            config,
            compiler,
            reconciler,
            assembler,
        }
    }

    /// Run one build pass.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        let paths = discover_components(&self.config.components_dir)?;
        tracing::info!(
            "Building {} components from {} ({:?} mode)",
            paths.len(),
            self.config.components_dir.display(),
            self.config.mode
        );

        let mut failures = Vec::new();

        let extracted: Vec<Result<ExtractedComponent, ComponentFailure>> =
            paths.par_iter().map(|path| extract_component(path)).collect();
        let extracted = split_failures(extracted, &mut failures);

        let staged: Vec<(ExtractedComponent, Option<RenderArtifact>)> = match self.config.mode {
            BuildMode::Debug => extracted.into_iter().map(|c| (c, None)).collect(),
            BuildMode::Release => self.render_all(extracted, &mut failures).await?,
        };

        let imports = GlobalImportSet::from_artifacts(staged.iter().filter_map(|(_, a)| a.as_ref()));
        if self.config.mode == BuildMode::Release {
            tracing::debug!("Runtime imports across the pass: {}", imports.len());
        }

        let emitted: Vec<Result<Vec<WriteOutcome>, ComponentFailure>> = staged
            .par_iter()
            .map(|(component, artifact)| {
                self.emit(component, artifact.as_ref(), &imports)
                    .map_err(|e| ComponentFailure::new(&component.source.path, e))
            })
            .collect();

        let mut result = BuildResult {
            components: paths.len(),
            ..Default::default()
        };

        for outcome in split_failures(emitted, &mut failures).into_iter().flatten() {
            match outcome {
                WriteOutcome::Written => result.written += 1,
                WriteOutcome::Unchanged => result.unchanged += 1,
            }
        }

        failures.sort_by(|a, b| a.path.cmp(&b.path));
        result.failures = failures;
        result.duration_ms = start.elapsed().as_millis() as u64;

        Ok(result)
    }

    /// Compile every template in one batch and parse the returned artifacts.
    async fn render_all(
        &self,
        components: Vec<ExtractedComponent>,
        failures: &mut Vec<ComponentFailure>,
    ) -> Result<Vec<(ExtractedComponent, Option<RenderArtifact>)>, BuildError> {
        let batch = CompileBatch::new(
            components
                .iter()
                .map(|c| CompileRequest {
                    path: c.source.path.clone(),
                    id: c.source.stable_id(),
                    template: c.sections.template.clone(),
                })
                .collect(),
        );

        let compiled = self.compiler.compile_batch(&batch).await?;
        tracing::info!(
            "Compiled {} templates with {}",
            compiled.len(),
            self.compiler.name()
        );

        let mut staged = Vec::with_capacity(components.len());

        for component in components {
            let path = component.source.path.clone();
            let artifact = match compiled.get(&path) {
                Some(Ok(code)) => RenderArtifact::parse(code).map_err(ComponentError::from),
                Some(Err(message)) => Err(ComponentError::Compile(message.clone())),
                None => {
                    return Err(CompilerError::MissingArtifact(path.display().to_string()).into())
                }
            };

            match artifact {
                Ok(artifact) => staged.push((component, Some(artifact))),
                Err(e) => {
                    let failure = ComponentFailure::new(&path, e);
                    tracing::warn!("{}", failure);
                    failures.push(failure);
                }
            }
        }

        Ok(staged)
    }

    /// Assemble a component and write its outputs.
    fn emit(
        &self,
        component: &ExtractedComponent,
        artifact: Option<&RenderArtifact>,
        imports: &GlobalImportSet,
    ) -> Result<Vec<WriteOutcome>, ComponentError> {
        let render = match artifact {
            Some(artifact) => RenderAttachment::Compiled(self.reconciler.reconcile(artifact, imports)),
            None => RenderAttachment::Template(component.sections.template.clone()),
        };

        let module = self.assembler.assemble(
            component.source.name(),
            &render,
            &component.members,
            &component.localization,
        )?;

        let source = &component.source;
        let mut outcomes = vec![write_output(&source.output_path("js"), &module)?];

        if component.sections.has_style() {
            let style = &component.sections.style;
            outcomes.push(write_output(&source.output_path("css"), style)?);

            if self.config.minify {
                match minify_css(style) {
                    Ok(min) => outcomes.push(write_output(&source.output_path("min.css"), &min)?),
                    Err(e) => tracing::warn!("{}: {}", source.basename(), e),
                }
            }
        }

        Ok(outcomes)
    }
}

/// Read a component and validate its sections.
fn extract_component(path: &Path) -> Result<ExtractedComponent, ComponentFailure> {
    let fail = |e: ComponentError| ComponentFailure::new(path, e);

    let source = ComponentSource::read(path).map_err(|e| fail(ComponentError::Read(e)))?;
    let sections = extract_sections(&source.content).map_err(|e| fail(e.into()))?;
    let members = sections
        .script_members()
        .map_err(|e| fail(e.into()))?
        .to_string();
    let localization =
        LocalizationTable::parse(&sections.localization).map_err(|e| fail(e.into()))?;

    Ok(ExtractedComponent {
        source,
        sections,
        members,
        localization,
    })
}

fn write_output(path: &Path, contents: &str) -> Result<WriteOutcome, ComponentError> {
    write_if_changed(path, contents).map_err(|e| ComponentError::Write {
        path: path.display().to_string(),
        source: e,
    })
}
