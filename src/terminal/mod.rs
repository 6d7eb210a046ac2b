//! Output Filter Chain
//!
//! Turns raw process output into text and classifies it: prompts mark
//! command boundaries, directory announcements and compilation messages
//! become state transitions. Classifiers are pure and return small events;
//! the session decides what to do with them.

pub mod echo;
pub mod filters;
pub mod prompt;

pub use echo::EchoSuppressor;
pub use filters::{
    CompilationClassifier, CompileOutcome, DirectoryAnnouncementClassifier,
    DirectoryCommandClassifier, FilterChain, FilterEvent, Fragment, InputClassifier, InputEvent,
    OutputClassifier, OutputDecoder, OutputScanner, PromptClassifier,
};
pub use prompt::{PromptDetector, PromptKind};
