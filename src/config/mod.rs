//! Configuration management for fricas-session
//!
//! Everything the presentation layer hands to the core lives here: how to
//! launch the process, how to recognise its prompts, how long a redirected
//! query may take, how views are named and where compiled output goes.

pub mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How the FriCAS process is launched
    pub process: ProcessConfig,

    /// Prompt recognition
    pub prompts: PromptConfig,

    /// Redirected query behaviour
    pub redirect: RedirectConfig,

    /// View naming strings
    pub views: ViewConfig,

    /// Compilation output placement
    pub compile: CompileConfig,
}

/// Process launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Executable to launch
    pub program: String,

    /// Arguments passed to the executable
    pub args: Vec<String>,

    /// Extra environment variables
    pub environment: HashMap<String, String>,

    /// Whether to inherit the parent environment
    pub inherit_env: bool,

    /// Directory the process starts in
    pub working_directory: Option<PathBuf>,

    /// Command run once right after start
    pub preamble: Option<String>,

    /// The PTY echoes every line we send; strip it from the output
    pub process_echoes: bool,

    /// PTY rows
    pub pty_rows: u16,

    /// PTY columns
    pub pty_cols: u16,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            program: "fricas".to_string(),
            args: vec!["-nosman".to_string()],
            environment: HashMap::new(),
            inherit_env: true,
            working_directory: None,
            preamble: None,
            process_echoes: true,
            pty_rows: 24,
            pty_cols: 200,
        }
    }
}

/// Prompt patterns, either of which ends a command's output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Numbered input prompt, e.g. `(3) -> `
    pub normal: String,

    /// Debugger/break prompt, e.g. `0] `
    pub break_prompt: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            normal: r"^\(\d+\) -> *$".to_string(),
            break_prompt: r"^\d+\] *$".to_string(),
        }
    }
}

/// Redirected query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Upper bound on waiting for a redirected command's prompt
    pub timeout_ms: u64,

    /// How long a single wait on the output channel lasts before re-checking
    pub poll_slice_ms: u64,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            poll_slice_ms: 50,
        }
    }
}

impl RedirectConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_slice(&self) -> Duration {
        Duration::from_millis(self.poll_slice_ms.max(1))
    }
}

/// View naming strings used by the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Name of the interactive transcript view
    pub interactive_name: String,

    /// Template for info views; `{kind}` and `{name}` are substituted
    pub info_view_format: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            interactive_name: "*fricas*".to_string(),
            info_view_format: "*fricas {kind}: {name}*".to_string(),
        }
    }
}

impl ViewConfig {
    /// Render the title of an info view
    pub fn info_view_name(&self, kind: &str, name: &str) -> String {
        self.info_view_format
            .replace("{kind}", kind)
            .replace("{name}", name)
    }
}

/// Where `)compile` output ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompileOutput {
    /// Next to the source file
    #[default]
    PerFile,
    /// In one shared directory
    Centralized,
}

/// Compilation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Output placement mode
    pub output: CompileOutput,

    /// Shared output directory for [`CompileOutput::Centralized`]
    pub central_directory: Option<PathBuf>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            output: CompileOutput::PerFile,
            central_directory: dirs::cache_dir()
                .map(|dir| dir.join("fricas-session").join("compiled")),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Program must not be empty")]
    EmptyProgram,

    #[error("Invalid prompt pattern '{pattern}': {source}")]
    InvalidPromptPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Redirect timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Centralized compile output needs a central_directory")]
    MissingCentralDirectory,
}

impl ConfigError {
    /// Dotted path of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::EmptyProgram => "process.program",
            ConfigError::InvalidPromptPattern { .. } => "prompts",
            ConfigError::ZeroTimeout => "redirect.timeout_ms",
            ConfigError::MissingCentralDirectory => "compile.central_directory",
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::ConfigValidationFailed {
            field: err.field().to_string(),
            reason: err.to_string(),
        }
    }
}

impl Config {
    /// Check the configuration for values the session cannot work with
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.process.program.trim().is_empty() {
            return Err(ConfigError::EmptyProgram);
        }

        for pattern in [&self.prompts.normal, &self.prompts.break_prompt] {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPromptPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        if self.redirect.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.compile.output == CompileOutput::Centralized
            && self.compile.central_directory.is_none()
        {
            return Err(ConfigError::MissingCentralDirectory);
        }

        Ok(())
    }
}
