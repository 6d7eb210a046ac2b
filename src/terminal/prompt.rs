//! Prompt Detection Logic
//!
//! Recognises the FriCAS input prompt and its break (debugger) prompt.

use regex::Regex;

use crate::config::PromptConfig;
use crate::error::Result;

/// Which prompt was seen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Numbered input prompt, ready for the next command
    Normal,
    /// Error/debugger prompt
    Break,
}

/// Prompt detector built from the configured patterns
#[derive(Debug, Clone)]
pub struct PromptDetector {
    normal: Regex,
    break_prompt: Regex,
}

impl PromptDetector {
    /// Compile the configured prompt patterns
    pub fn new(config: &PromptConfig) -> Result<Self> {
        Ok(Self {
            normal: Regex::new(&config.normal)?,
            break_prompt: Regex::new(&config.break_prompt)?,
        })
    }

    /// Classify a single (partial) line
    pub fn detect(&self, line: &str) -> Option<PromptKind> {
        if self.normal.is_match(line) {
            Some(PromptKind::Normal)
        } else if self.break_prompt.is_match(line) {
            Some(PromptKind::Break)
        } else {
            None
        }
    }

    /// Whether the line is any kind of prompt
    pub fn is_prompt(&self, line: &str) -> bool {
        self.detect(line).is_some()
    }

    /// If `text` ends in a prompt, split it into (output, prompt)
    pub fn split_trailing_prompt<'a>(&self, text: &'a str) -> Option<(&'a str, &'a str, PromptKind)> {
        let start = text.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let last_line = &text[start..];
        if last_line.is_empty() {
            return None;
        }
        self.detect(last_line)
            .map(|kind| (&text[..start], last_line, kind))
    }
}
