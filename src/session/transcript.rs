//! Interactive transcript with a commit point
//!
//! Everything before the commit point has been sent to the process or
//! printed by it. Everything after is input the user is still composing.
//! Process output is inserted at the commit point, so it always lands in
//! front of half-typed input instead of splitting it.

/// Text of the interactive view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
    commit: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole transcript
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Committed part: sent input and process output
    pub fn committed(&self) -> &str {
        &self.text[..self.commit]
    }

    /// Input typed after the commit point
    pub fn pending(&self) -> &str {
        &self.text[self.commit..]
    }

    /// Byte offset of the commit point
    pub fn commit_point(&self) -> usize {
        self.commit
    }

    /// Append user typing after any pending input
    pub fn type_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Insert process output at the commit point and move past it
    pub fn insert_output(&mut self, output: &str) {
        self.text.insert_str(self.commit, output);
        self.commit += output.len();
    }

    /// Remove and return pending input
    pub fn take_pending(&mut self) -> String {
        self.text.split_off(self.commit)
    }

    /// Put previously taken input back after the commit point
    pub fn restore_pending(&mut self, pending: &str) {
        self.text.push_str(pending);
    }

    /// Commit `input` as a sent line
    ///
    /// Pending input must have been taken first, so `input` ends up right
    /// after the committed text.
    pub fn commit_line(&mut self, input: &str) {
        debug_assert_eq!(self.commit, self.text.len());
        self.text.push_str(input);
        self.text.push('\n');
        self.commit = self.text.len();
    }

    /// Drop everything, e.g. after a restart
    pub fn clear(&mut self) {
        self.text.clear();
        self.commit = 0;
    }
}
