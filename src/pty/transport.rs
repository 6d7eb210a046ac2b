//! Transport abstraction over the external process

use async_trait::async_trait;

use super::streams::TryRecv;
use crate::error::Result;

/// A live connection to an interactive process.
///
/// Output arrives in send order; `recv` resolves to `None` once the process
/// side of the stream has closed and every buffered chunk has been taken.
#[async_trait]
pub trait Transport: Send {
    /// Queue bytes for the process's standard input
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Wait for the next chunk of output
    async fn recv(&mut self) -> Option<Vec<u8>>;

    /// Take a chunk of output if one is already buffered
    fn try_recv(&mut self) -> TryRecv;

    /// Whether the process is still alive
    fn is_running(&mut self) -> bool;

    /// Interrupt the current computation (Ctrl+C equivalent)
    fn interrupt(&mut self) -> Result<()>;

    /// Best-effort termination; does not wait for the process to exit
    fn terminate(&mut self) -> Result<()>;

    /// OS process id, if known
    fn pid(&self) -> Option<u32>;
}
