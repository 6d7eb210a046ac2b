//! Process signals
//!
//! Interrupt and kill the FriCAS process by PID.

use crate::error::{Error, Result};

/// Signals the session sends to its process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Interrupt signal (Ctrl+C)
    Interrupt,
    /// Kill signal (forceful termination)
    Kill,
}

/// Send a signal to a process by PID
#[cfg(unix)]
pub fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    use nix::sys::signal::{kill, Signal as NixSignal};
    use nix::unistd::Pid;

    let nix_signal = match signal {
        Signal::Interrupt => NixSignal::SIGINT,
        Signal::Kill => NixSignal::SIGKILL,
    };

    kill(Pid::from_raw(pid as i32), nix_signal).map_err(|e| Error::SignalSendFailed {
        signal: format!("{:?}", signal),
        reason: e.to_string(),
    })
}

/// Send a signal to a process by PID
#[cfg(not(unix))]
pub fn send_signal(_pid: u32, signal: Signal) -> Result<()> {
    Err(Error::SignalSendFailed {
        signal: format!("{:?}", signal),
        reason: format!("signals are not supported on {}", std::env::consts::OS),
    })
}
