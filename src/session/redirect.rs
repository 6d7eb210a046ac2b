//! Redirected queries
//!
//! A redirect sends one command and diverts everything the process prints
//! until the next prompt into a [`CaptureSink`] instead of the transcript.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::terminal::{PromptDetector, PromptKind};

/// Flags controlling where a redirected command and its result show up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedirectOptions {
    /// Ask the presentation layer to show the sink afterwards
    pub display: bool,
    /// Insert the command into the interactive transcript
    pub echo_command: bool,
    /// Mirror the captured output into the interactive transcript
    pub echo_result: bool,
}

impl RedirectOptions {
    /// Silent capture, used for internal queries
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Capture into a view the user will look at
    pub fn displayed() -> Self {
        Self {
            display: true,
            ..Self::default()
        }
    }
}

/// Destination for captured output
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    name: String,
    text: String,
    read_only: bool,
    modified: bool,
    display_requested: bool,
}

impl CaptureSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Unnamed sink for internal queries
    pub fn scratch() -> Self {
        Self::new(" *fricas-scratch*")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn display_requested(&self) -> bool {
        self.display_requested
    }

    pub fn append(&mut self, text: &str) {
        if !text.is_empty() {
            self.text.push_str(text);
            self.modified = true;
        }
    }

    /// Empty the sink and make it writable again
    pub fn clear(&mut self) {
        self.text.clear();
        self.read_only = false;
        self.modified = false;
    }

    /// Freeze the contents: read-only and unmodified
    pub fn seal(&mut self) {
        self.read_only = true;
        self.modified = false;
    }

    pub fn request_display(&mut self) {
        self.display_requested = true;
    }

    pub fn take_display_request(&mut self) -> bool {
        std::mem::replace(&mut self.display_requested, false)
    }
}

/// Output collected for the redirect currently in flight
#[derive(Debug)]
pub(crate) struct RedirectCapture {
    command: String,
    buffer: String,
    prompt: Option<(usize, PromptKind)>,
}

impl RedirectCapture {
    pub(crate) fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            buffer: String::new(),
            prompt: None,
        }
    }

    pub(crate) fn command(&self) -> &str {
        &self.command
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.prompt.is_some()
    }

    /// Add output; completes once the buffer ends in a prompt
    pub(crate) fn push(&mut self, text: &str, detector: &PromptDetector) {
        self.buffer.push_str(text);
        if let Some((output, _, kind)) = detector.split_trailing_prompt(&self.buffer) {
            self.prompt = Some((output.len(), kind));
        }
    }

    /// Split into (output, prompt)
    pub(crate) fn finish(mut self) -> (String, String) {
        match self.prompt {
            Some((split, _)) => {
                let prompt = self.buffer.split_off(split);
                (self.buffer, prompt)
            }
            None => (self.buffer, String::new()),
        }
    }
}

/// Holds the per-session "redirect in flight" flag until dropped
pub(crate) struct RedirectGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RedirectGuard<'a> {
    /// Claim the flag, or `None` if a redirect is already running
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RedirectGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
