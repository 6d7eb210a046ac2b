//! fricas-session - drive an interactive FriCAS process from an editor
//!
//! This library is the part of an editor integration that does not care
//! how things are drawn: it runs FriCAS in a pseudoterminal, keeps the
//! interactive transcript, runs side queries whose output is captured
//! instead of shown, tracks the process's working directory and knows the
//! names of FriCAS constructors and operations.
//!
//! ## Module Organization
//!
//! - [`pty`] - process transport: spawning, I/O threads, signals
//! - [`session`] - sessions, transcript, command dispatch, redirects, registry
//! - [`terminal`] - output decoding, echo suppression, prompt and output classifiers
//! - [`directory`] - working-directory cache and announcement parsing
//! - [`vocabulary`] - constructor/operation names and abbreviations
//! - [`views`] - cached documentation views
//! - [`files`] - `)read` and `)compile`
//! - [`config`] - configuration loading and validation
//! - [`mod@error`] - error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use fricas_session::{load_config, Session};
//!
//! # async fn run() -> fricas_session::Result<()> {
//! let config = load_config(None)?;
//! let session = Session::start("fricas", config).await?;
//! session.submit("integrate(sin(x)^2, x)").await?;
//! for event in session.poll().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Blocking PTY reads and writes run on two OS threads per process and
//! talk to the async side over channels. Everything else is async on
//! `tokio`; a session is shared as `Arc<Session>` and pumped by `poll()`.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod directory;
pub mod error;
pub mod files;
pub mod pty;
pub mod session;
pub mod terminal;
pub mod views;
pub mod vocabulary;

pub use config::loader::ConfigLoader;
pub use config::Config;
pub use error::{Error, Result};
pub use session::{
    CaptureSink, RedirectOptions, Session, SessionEvent, SessionRegistry, Transcript,
};
pub use terminal::{CompileOutcome, PromptKind};
pub use views::InfoViews;

/// The current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The package name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The package description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Load configuration from `path`, or from the default locations
///
/// An explicit path must load. Without one, a broken or missing file
/// falls back to the defaults.
pub fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    if let Some(path) = path {
        let config = ConfigLoader::load_from_path(path)?;
        info!("Configuration loaded from {}", path.display());
        return Ok(config);
    }

    match ConfigLoader::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("Failed to load configuration: {}. Using defaults", e);
            Ok(Config::default())
        }
    }
}

/// Turn a startup error into a message with hints for the user
pub fn handle_startup_error(error: &Error) -> String {
    match error {
        Error::ProcessSpawnError { command, reason } => {
            format!(
                "Could not start '{}': {}\n\nTry:\n• Check that FriCAS is installed\n• Set process.program in the configuration",
                command, reason
            )
        }
        Error::ConfigLoadFailed { path, reason } => {
            format!(
                "Configuration Error: Failed to load config from '{}': {}",
                path.display(),
                reason
            )
        }
        Error::ConfigParseFailed { format, reason } => {
            format!(
                "Configuration Error: Failed to parse {} config: {}",
                format, reason
            )
        }
        Error::ConfigValidationFailed { field, reason } => {
            format!(
                "Configuration Error: Validation failed for '{}': {}",
                field, reason
            )
        }
        _ => format!("Unexpected Error: {}", error),
    }
}
