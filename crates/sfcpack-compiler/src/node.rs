//! Template compiler backed by `@vue/compiler-sfc` running under Node.js.
//!
//! A small driver script is written into the compiler's work directory and run
//! once per batch. The batch goes to the driver as JSON on stdin; the driver
//! answers with `{ "results": [{ "path", "code" | "error" }] }` on stdout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::traits::{CompileBatch, CompileOutcome, CompiledBatch, CompilerError, TemplateCompiler};

/// File name of the driver script inside the work directory.
pub const DRIVER_FILE: &str = "sfc-template-compiler.js";

/// Default upper bound for one compiler invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Template compiler running the Vue SFC compiler through Node.js.
#[derive(Debug, Clone)]
pub struct NodeCompiler {
    program: String,
    /// Arguments placed before the driver path
    args: Vec<String>,
    work_dir: PathBuf,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct DriverResponse {
    results: Vec<CompileOutcome>,
}

impl NodeCompiler {
    /// Create a compiler using `node` from `PATH` and the given work directory.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "node".to_string(),
            args: Vec::new(),
            work_dir: work_dir.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a different Node.js executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Pass extra arguments to the executable ahead of the driver script.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Write the driver script unless an identical one is already in place.
    fn write_driver(&self) -> Result<PathBuf, CompilerError> {
        fs::create_dir_all(&self.work_dir).map_err(|e| {
            CompilerError::Setup(format!("{}: {}", self.work_dir.display(), e))
        })?;

        let path = self.work_dir.join(DRIVER_FILE);
        let current = fs::read_to_string(&path).ok();
        if current.as_deref() != Some(DRIVER_SCRIPT) {
            fs::write(&path, DRIVER_SCRIPT)
                .map_err(|e| CompilerError::Setup(format!("{}: {}", path.display(), e)))?;
            tracing::debug!("Wrote compiler driver {}", path.display());
        }

        Ok(path)
    }

    async fn run_driver(&self, driver: &Path, request: Vec<u8>) -> Result<Vec<u8>, CompilerError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(driver)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CompilerError::Spawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CompilerError::Setup("compiler stdin unavailable".to_string()))?;

        // Dropping the child on timeout kills the process.
        let run = async move {
            // A driver that exits without reading its input is judged by its exit status.
            if let Err(e) = stdin.write_all(&request).await {
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(e);
                }
            }
            drop(stdin);
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| CompilerError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(CompilerError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl TemplateCompiler for NodeCompiler {
    fn name(&self) -> &'static str {
        "node"
    }

    async fn compile_batch(&self, batch: &CompileBatch) -> Result<CompiledBatch, CompilerError> {
        if batch.is_empty() {
            return Ok(CompiledBatch::default());
        }

        let driver = self.write_driver()?;
        let request =
            serde_json::to_vec(batch).map_err(|e| CompilerError::Setup(e.to_string()))?;

        tracing::info!(
            "Compiling {} templates with {} {}",
            batch.len(),
            self.program,
            driver.display()
        );

        let stdout = self.run_driver(&driver, request).await?;

        let response: DriverResponse = serde_json::from_slice(&stdout)
            .map_err(|e| CompilerError::InvalidResponse(e.to_string()))?;

        CompiledBatch::from_outcomes(batch, response.results)
    }
}

const DRIVER_SCRIPT: &str = r#"const { compileTemplate } = require('@vue/compiler-sfc');

let input = '';
process.stdin.setEncoding('utf8');
process.stdin.on('data', (chunk) => {
  input += chunk;
});
process.stdin.on('end', () => {
  const batch = JSON.parse(input);
  const results = batch.components.map((component) => {
    try {
      const result = compileTemplate({
        filename: component.path,
        id: component.id,
        isProd: batch.production,
        source: component.template,
        compilerOptions: { comments: batch.comments },
      });
      if (result.errors && result.errors.length > 0) {
        return { path: component.path, error: result.errors.map(String).join('\n') };
      }
      return { path: component.path, code: result.code };
    } catch (err) {
      return { path: component.path, error: String(err) };
    }
  });
  process.stdout.write(JSON.stringify({ results }));
});
"#;
