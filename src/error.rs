//! Error types and Result aliases for fricas-session

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fricas-session
#[derive(Debug)]
pub enum Error {
    // === Session errors ===
    /// No live process behind the session
    ProcessNotRunning {
        session: String,
    },

    /// The FriCAS executable could not be launched
    ProcessSpawnError {
        command: String,
        reason: String,
    },

    /// Expected marker text was not present in captured output
    PatternMatchMiss {
        pattern: String,
    },

    /// A redirected query was issued while another one is outstanding
    IllegalConcurrentRedirect {
        session: String,
        command: String,
    },

    /// A redirected query did not see its closing prompt in time
    Timeout {
        command: String,
        duration: Duration,
    },

    // === PTY-related errors ===
    /// Failed to create PTY
    PtyCreationFailed {
        command: String,
        reason: String,
    },

    /// Failed to clone PTY reader
    PtyReaderCloneFailed {
        reason: String,
    },

    /// Failed to take PTY writer
    PtyWriterTakeFailed {
        reason: String,
    },

    /// Failed to send input to PTY
    PtyInputSendFailed {
        reason: String,
    },

    /// Failed to send signal to process
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound,

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to serialize configuration
    ConfigSerializationFailed {
        format: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    /// Generic errors
    Other(String),
}

impl Error {
    /// Whether restarting the process is the only way forward
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProcessNotRunning { .. } | Error::ProcessSpawnError { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Session errors
            Error::ProcessNotRunning { session } => {
                write!(f, "No FriCAS process running for session '{}'", session)
            }
            Error::ProcessSpawnError { command, reason } => {
                write!(f, "Failed to start '{}': {}", command, reason)
            }
            Error::PatternMatchMiss { pattern } => {
                write!(f, "Expected output matching '{}' was not found", pattern)
            }
            Error::IllegalConcurrentRedirect { session, command } => {
                write!(
                    f,
                    "Redirect already in progress on session '{}', refusing '{}'",
                    session, command
                )
            }
            Error::Timeout { command, duration } => {
                write!(f, "Command '{}' timed out after {:?}", command, duration)
            }

            // PTY errors
            Error::PtyCreationFailed { command, reason } => {
                write!(f, "Failed to create PTY for command '{}': {}", command, reason)
            }
            Error::PtyReaderCloneFailed { reason } => {
                write!(f, "Failed to clone PTY reader: {}", reason)
            }
            Error::PtyWriterTakeFailed { reason } => {
                write!(f, "Failed to take PTY writer: {}", reason)
            }
            Error::PtyInputSendFailed { reason } => {
                write!(f, "Failed to send input to PTY: {}", reason)
            }
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "Failed to send signal '{}': {}", signal, reason)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigNotFound => {
                write!(f, "Configuration file not found")
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigSerializationFailed { format, reason } => {
                write!(f, "Failed to serialize config as {}: {}", format, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
