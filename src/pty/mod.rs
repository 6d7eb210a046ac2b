//! Session Transport
//!
//! Owns the FriCAS child process and the single bidirectional byte stream
//! to it. The rest of the crate only ever talks to a [`Transport`], so tests
//! can substitute a scripted process for the real pseudoterminal.

pub mod process;
pub mod signals;
pub mod streams;
pub mod transport;

pub use process::{spawn_pty_process, PtyTransport, SpawnConfig};
pub use signals::Signal;
pub use streams::{PtyStreams, TryRecv};
pub use transport::Transport;
