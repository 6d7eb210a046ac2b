//! PTY Streams
//!
//! Bridges the blocking PTY master reads/writes to async code using channels.

use crate::error::{Error, Result};
use std::sync::mpsc::Sender as StdSender;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;

/// Outcome of a non-blocking read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryRecv {
    /// A chunk of output
    Data(Vec<u8>),
    /// Nothing buffered right now
    Empty,
    /// The producer side is gone and the buffer is drained
    Closed,
}

/// PTY I/O streams wrapper
pub struct PtyStreams {
    /// Receiver for output bytes from the PTY
    output_rx: UnboundedReceiver<Vec<u8>>,
    /// Sender for input bytes to the PTY
    input_tx: StdSender<Vec<u8>>,
}

impl PtyStreams {
    /// Create new PTY streams from channels
    pub fn from_channels(
        output_rx: UnboundedReceiver<Vec<u8>>,
        input_tx: StdSender<Vec<u8>>,
    ) -> Self {
        Self {
            output_rx,
            input_tx,
        }
    }

    /// Hand data to the writer thread
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.input_tx
            .send(data.to_vec())
            .map_err(|e| Error::PtyInputSendFailed {
                reason: e.to_string(),
            })
    }

    /// Wait for the next chunk; `None` once the reader thread has exited
    pub async fn read(&mut self) -> Option<Vec<u8>> {
        self.output_rx.recv().await
    }

    /// Read without waiting
    pub fn try_read_now(&mut self) -> TryRecv {
        match self.output_rx.try_recv() {
            Ok(bytes) => TryRecv::Data(bytes),
            Err(TryRecvError::Empty) => TryRecv::Empty,
            Err(TryRecvError::Disconnected) => TryRecv::Closed,
        }
    }
}
