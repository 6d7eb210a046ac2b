//! Directory Tracker
//!
//! Remembers the FriCAS process's working directory. The process is the
//! only authority: the cache is refreshed by parsing its own announcement
//! ("... default directory is <path>") rather than by guessing what a
//! `)cd` or `)read` did.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Text FriCAS prints right before the directory
pub const ANNOUNCEMENT_MARKER: &str = "default directory is";

/// Command that makes FriCAS announce its directory without changing it
pub const DIRECTORY_QUERY: &str = ")cd .";

static ANNOUNCEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)default directory is\s+(\S.*?)[ \t]*$").unwrap());

/// Cached working directory plus the "may be stale" flag
#[derive(Debug, Clone, Default)]
pub struct DirectoryTracker {
    current: Option<PathBuf>,
    update_pending: bool,
    last_updated: Option<DateTime<Utc>>,
}

impl DirectoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known directory, always ending in a separator
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// A command was sent that may have moved the process
    pub fn mark_pending(&mut self) {
        self.update_pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.update_pending
    }

    /// Clear the pending flag, returning whether it was set
    pub fn take_pending(&mut self) -> bool {
        std::mem::replace(&mut self.update_pending, false)
    }

    /// Store a freshly announced directory; returns true if it changed
    pub fn record(&mut self, path: PathBuf) -> bool {
        self.last_updated = Some(Utc::now());
        if self.current.as_ref() == Some(&path) {
            return false;
        }
        debug!("FriCAS directory is now {}", path.display());
        self.current = Some(path);
        true
    }
}

/// Pull the raw directory out of captured output
pub fn parse_announcement(text: &str) -> Result<String> {
    ANNOUNCEMENT
        .captures(text)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::PatternMatchMiss {
            pattern: ANNOUNCEMENT_MARKER.to_string(),
        })
}

/// Absolute, lexically normalised form of an announced directory
///
/// `~` expands to the home directory, relative paths resolve against
/// `base`, and the result ends with a separator.
pub fn normalize_directory(raw: &str, base: Option<&Path>) -> PathBuf {
    let raw = raw.trim();
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(raw),
        },
        _ => PathBuf::from(raw),
    };

    let absolute = match base {
        Some(base) if expanded.is_relative() => base.join(expanded),
        _ => expanded,
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }

    with_trailing_separator(&normalized)
}

/// `path` with exactly one trailing separator
pub fn with_trailing_separator(path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        return PathBuf::from("./");
    }
    path.join("")
}
