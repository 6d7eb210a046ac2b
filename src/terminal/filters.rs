//! Input and output classifiers
//!
//! Output passes through an [`OutputDecoder`] (bytes to clean text), then an
//! [`OutputScanner`] which cuts it into lines and offers each line, plus the
//! unfinished tail, to the registered [`OutputClassifier`]s. Commands sent
//! interactively are offered to the [`InputClassifier`]s before they go out.

use once_cell::sync::Lazy;
use regex::Regex;

use super::prompt::{PromptDetector, PromptKind};
use crate::config::PromptConfig;
use crate::directory;
use crate::error::Result;

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b\][^\x07]*\x07|\x1b[()][A-Za-z0-9]|\x1b[=>]").unwrap()
});

static COMPILED_CONSTRUCTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\S+) will be automatically loaded when needed from").unwrap()
});

static COMPILE_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(comp fails at level|There (?:was|were) \d+ compilation errors?)").unwrap()
});

/// A piece of output offered to classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    /// A complete line, newline removed
    Line(&'a str),
    /// Text after the last newline seen so far
    Tail(&'a str),
}

/// Result of a `)compile`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Succeeded { constructor: String },
    Failed {
        message: String,
    },
}

/// State transition detected in the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    Prompt(PromptKind),
    DirectoryAnnounced(String),
    Compilation(CompileOutcome),
}

/// State transition implied by a command about to be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The command may move the process to another directory
    DirectoryMayChange,
}

pub trait OutputClassifier: Send + Sync {
    fn name(&self) -> &'static str;
    fn classify(&self, fragment: Fragment<'_>) -> Option<FilterEvent>;
}

pub trait InputClassifier: Send + Sync {
    fn name(&self) -> &'static str;
    fn classify(&self, command: &str) -> Option<InputEvent>;
}

/// Reports prompts at the end of the output
#[derive(Debug, Clone)]
pub struct PromptClassifier {
    detector: PromptDetector,
}

impl PromptClassifier {
    pub fn new(detector: PromptDetector) -> Self {
        Self { detector }
    }
}

impl OutputClassifier for PromptClassifier {
    fn name(&self) -> &'static str {
        "prompt"
    }

    fn classify(&self, fragment: Fragment<'_>) -> Option<FilterEvent> {
        match fragment {
            Fragment::Tail(tail) => self.detector.detect(tail).map(FilterEvent::Prompt),
            Fragment::Line(_) => None,
        }
    }
}

/// Picks up "default directory is ..." announcements, e.g. from `)cd`
#[derive(Debug, Clone, Default)]
pub struct DirectoryAnnouncementClassifier;

impl OutputClassifier for DirectoryAnnouncementClassifier {
    fn name(&self) -> &'static str {
        "directory-announcement"
    }

    fn classify(&self, fragment: Fragment<'_>) -> Option<FilterEvent> {
        match fragment {
            Fragment::Line(line) => directory::parse_announcement(line)
                .ok()
                .map(FilterEvent::DirectoryAnnounced),
            Fragment::Tail(_) => None,
        }
    }
}

/// Recognises the end of a `)compile`
#[derive(Debug, Clone, Default)]
pub struct CompilationClassifier;

impl OutputClassifier for CompilationClassifier {
    fn name(&self) -> &'static str {
        "compilation"
    }

    fn classify(&self, fragment: Fragment<'_>) -> Option<FilterEvent> {
        let Fragment::Line(line) = fragment else {
            return None;
        };

        if let Some(caps) = COMPILED_CONSTRUCTOR.captures(line) {
            return Some(FilterEvent::Compilation(CompileOutcome::Succeeded {
                constructor: caps[1].to_string(),
            }));
        }

        if COMPILE_FAILURE.is_match(line) {
            return Some(FilterEvent::Compilation(CompileOutcome::Failed {
                message: line.trim().to_string(),
            }));
        }

        None
    }
}

/// Flags `)cd` and `)read` as commands that may change directory
#[derive(Debug, Clone, Default)]
pub struct DirectoryCommandClassifier;

impl DirectoryCommandClassifier {
    fn is_system_command(command: &str, keyword: &str) -> bool {
        let Some(rest) = command.trim_start().strip_prefix(')') else {
            return false;
        };
        match rest.strip_prefix(keyword) {
            Some(after) => after.is_empty() || after.starts_with(char::is_whitespace),
            None => false,
        }
    }
}

impl InputClassifier for DirectoryCommandClassifier {
    fn name(&self) -> &'static str {
        "directory-command"
    }

    fn classify(&self, command: &str) -> Option<InputEvent> {
        if Self::is_system_command(command, "cd") || Self::is_system_command(command, "read") {
            Some(InputEvent::DirectoryMayChange)
        } else {
            None
        }
    }
}

/// Ordered set of classifiers for one session
pub struct FilterChain {
    prompt: PromptDetector,
    input: Vec<Box<dyn InputClassifier>>,
    output: Vec<Box<dyn OutputClassifier>>,
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("input", &self.input.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("output", &self.output.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl FilterChain {
    /// Chain with the standard FriCAS classifiers
    pub fn new(config: &PromptConfig) -> Result<Self> {
        let prompt = PromptDetector::new(config)?;
        Ok(Self::empty(prompt.clone())
            .with_input(DirectoryCommandClassifier)
            .with_output(PromptClassifier::new(prompt))
            .with_output(DirectoryAnnouncementClassifier)
            .with_output(CompilationClassifier))
    }

    /// Chain that only knows where commands end
    pub fn empty(prompt: PromptDetector) -> Self {
        Self {
            prompt,
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn with_input(mut self, classifier: impl InputClassifier + 'static) -> Self {
        self.input.push(Box::new(classifier));
        self
    }

    pub fn with_output(mut self, classifier: impl OutputClassifier + 'static) -> Self {
        self.output.push(Box::new(classifier));
        self
    }

    pub fn prompt(&self) -> &PromptDetector {
        &self.prompt
    }

    pub fn classify_input(&self, command: &str) -> Vec<InputEvent> {
        self.input
            .iter()
            .filter_map(|classifier| classifier.classify(command))
            .collect()
    }

    pub fn classify_output(&self, fragment: Fragment<'_>) -> Vec<FilterEvent> {
        self.output
            .iter()
            .filter_map(|classifier| classifier.classify(fragment))
            .collect()
    }
}

/// Turns PTY bytes into clean text
///
/// UTF-8 sequences split across reads are carried over, carriage returns
/// and terminal escape sequences are dropped.
#[derive(Debug, Default)]
pub struct OutputDecoder {
    carry: Vec<u8>,
}

impl OutputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.carry.extend_from_slice(chunk);

        let text = match std::str::from_utf8(&self.carry) {
            Ok(text) => {
                let text = text.to_string();
                self.carry.clear();
                text
            }
            Err(e) if e.error_len().is_none() => {
                // Incomplete sequence at the end, keep it for the next chunk
                let valid = e.valid_up_to();
                let rest = self.carry.split_off(valid);
                let text = String::from_utf8_lossy(&self.carry).into_owned();
                self.carry = rest;
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.carry).into_owned();
                self.carry.clear();
                text
            }
        };

        clean_text(&text)
    }
}

/// Strip carriage returns and ANSI escape sequences
pub fn clean_text(text: &str) -> String {
    let without_cr: String = text.chars().filter(|&c| c != '\r').collect();
    ANSI_ESCAPE.replace_all(&without_cr, "").into_owned()
}

/// Splits interactive output into lines for the classifiers
#[derive(Debug, Default)]
pub struct OutputScanner {
    partial: String,
    tail_reported: bool,
}

impl OutputScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed clean text, returning events in output order
    pub fn feed(&mut self, text: &str, chain: &FilterChain) -> Vec<FilterEvent> {
        let mut events = Vec::new();

        for piece in text.split_inclusive('\n') {
            match piece.strip_suffix('\n') {
                Some(rest) => {
                    self.partial.push_str(rest);
                    let line = std::mem::take(&mut self.partial);
                    self.tail_reported = false;
                    events.extend(chain.classify_output(Fragment::Line(&line)));
                }
                None => self.partial.push_str(piece),
            }
        }

        if !self.partial.is_empty() && !self.tail_reported {
            let tail_events = chain.classify_output(Fragment::Tail(&self.partial));
            if !tail_events.is_empty() {
                self.tail_reported = true;
            }
            events.extend(tail_events);
        }

        events
    }

    /// Text after the last newline
    pub fn tail(&self) -> &str {
        &self.partial
    }

    pub fn reset(&mut self) {
        self.partial.clear();
        self.tail_reported = false;
    }
}
