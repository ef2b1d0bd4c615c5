//! Template compilation and module assembly for single-file components.
//!
//! This crate turns extracted component sections into self-registering modules:
//! it talks to the external template compiler, models the render artifacts it
//! returns, rewrites their identifiers for the host runtime, and assembles the
//! final module text.

pub mod artifact;
pub mod generator;
pub mod node;
pub mod reconcile;
pub mod traits;

pub use artifact::{ArtifactError, CodeFragment, Declaration, ImportSpec, RenderArtifact, Segment};
pub use generator::{embed_template, AssembleError, ModuleAssembler, RenderAttachment, RuntimeNames};
pub use node::NodeCompiler;
pub use reconcile::{GlobalImportSet, ReconciledRender, Reconciler};
pub use traits::{
    BuildMode, CompileBatch, CompileOutcome, CompileRequest, CompiledBatch, CompilerError,
    TemplateCompiler,
};
