//! File commands: `)read` and `)compile`
//!
//! Compilation writes its libraries into the process's current directory,
//! so `)compile` is bracketed by `)cd` into the output directory and back.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CompileConfig, CompileOutput};
use crate::directory::{self, ANNOUNCEMENT_MARKER};
use crate::error::{Error, Result};
use crate::session::Session;

/// Absolute form of a user-supplied path
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Directory compiled output for `source` should land in
pub fn compile_output_directory(config: &CompileConfig, source: &Path) -> Result<PathBuf> {
    match config.output {
        CompileOutput::PerFile => source
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Other(format!("{} has no parent directory", source.display()))),
        CompileOutput::Centralized => config.central_directory.clone().ok_or_else(|| {
            Error::ConfigValidationFailed {
                field: "compile.central_directory".to_string(),
                reason: "not set".to_string(),
            }
        }),
    }
}

impl Session {
    /// `)read` a file in the interactive session
    pub async fn read_file(&self, path: &Path) -> Result<()> {
        let path = absolute_path(path)?;
        self.submit(&format!(")read {}", path.display())).await
    }

    /// `)compile` a file, returning the directory the output goes to
    ///
    /// The process is moved into the output directory for the compile and
    /// then back to wherever it was before.
    pub async fn compile_file(&self, path: &Path) -> Result<PathBuf> {
        self.ensure_running().await?;
        let source = absolute_path(path)?;
        let output_dir = compile_output_directory(&self.config().compile, &source)?;
        if self.config().compile.output == CompileOutput::Centralized {
            fs::create_dir_all(&output_dir)?;
        }

        let prior = match self.working_directory() {
            Some(dir) if !self.directory_update_pending() => dir,
            _ => self
                .force_directory_update(true)
                .await?
                .ok_or_else(|| Error::PatternMatchMiss {
                    pattern: ANNOUNCEMENT_MARKER.to_string(),
                })?,
        };

        info!(
            "Compiling {} into {}",
            source.display(),
            output_dir.display()
        );
        self.submit(&format!(")cd {}", directory::with_trailing_separator(&output_dir).display()))
            .await?;
        self.submit(&format!(")compile {}", source.display())).await?;
        self.submit(&format!(")cd {}", prior.display())).await?;

        Ok(output_dir)
    }
}
