//! Echo suppression
//!
//! A PTY in canonical mode echoes every line we write. Each sent line is
//! registered here and removed from the output stream when it comes back,
//! so transcripts and captures only contain what FriCAS itself printed.

use std::collections::VecDeque;

/// Upper bound on outstanding echo expectations
const MAX_EXPECTED: usize = 32;

/// Strips the terminal's echo of lines we sent
#[derive(Debug, Default)]
pub struct EchoSuppressor {
    expected: VecDeque<String>,
    matched: usize,
    held: String,
}

impl EchoSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a line that was just written to the process
    pub fn expect(&mut self, line: &str) {
        let mut echo = line.trim_end_matches('\n').to_string();
        echo.push('\n');
        if self.expected.len() == MAX_EXPECTED {
            // Oldest echo never showed up; the process is not echoing
            self.expected.pop_front();
            self.release();
        }
        self.expected.push_back(echo);
    }

    /// Number of echoes still outstanding
    pub fn pending(&self) -> usize {
        self.expected.len()
    }

    /// Forget all expectations and flush anything held back
    pub fn clear(&mut self) -> String {
        self.expected.clear();
        self.matched = 0;
        std::mem::take(&mut self.held)
    }

    /// Remove echoed text from `text`
    ///
    /// A prefix of an expected echo at the end of `text` is held back until
    /// the next call decides whether it really was the echo.
    pub fn filter(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());

        for ch in text.chars() {
            loop {
                let Some(front) = self.expected.front() else {
                    out.push(ch);
                    break;
                };

                if front[self.matched..].starts_with(ch) {
                    self.matched += ch.len_utf8();
                    self.held.push(ch);
                    if self.matched == front.len() {
                        self.expected.pop_front();
                        self.matched = 0;
                        self.held.clear();
                    }
                    break;
                }

                if self.matched == 0 {
                    out.push(ch);
                    break;
                }

                // Partial match turned out to be real output; retry this char
                out.push_str(&self.held);
                self.release();
            }
        }

        out
    }

    fn release(&mut self) {
        self.matched = 0;
        self.held.clear();
    }
}
