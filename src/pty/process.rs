//! PTY Process Spawning
//!
//! Starts the FriCAS process inside a pseudoterminal using the portable-pty
//! crate, and bridges its blocking I/O onto channels.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtyPair, PtySize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;

use super::signals::{send_signal, Signal};
use super::streams::{PtyStreams, TryRecv};
use super::transport::Transport;
use crate::config::ProcessConfig;
use crate::error::{Error, Result};

/// Everything needed to launch the process
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Program to run
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Extra environment variables
    pub env_vars: HashMap<String, String>,
    /// Whether to inherit the parent environment
    pub inherit_env: bool,
    /// Working directory
    pub working_directory: Option<PathBuf>,
    /// Terminal size
    pub size: PtySize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self::from(&ProcessConfig::default())
    }
}

impl From<&ProcessConfig> for SpawnConfig {
    fn from(config: &ProcessConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            env_vars: config.environment.clone(),
            inherit_env: config.inherit_env,
            working_directory: config.working_directory.clone(),
            size: PtySize {
                rows: config.pty_rows,
                cols: config.pty_cols,
                pixel_width: 0,
                pixel_height: 0,
            },
        }
    }
}

impl SpawnConfig {
    /// Program and arguments as one display string
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A process running in a pseudoterminal
pub struct PtyTransport {
    child: Box<dyn Child + Send + Sync>,
    // Dropping the master hangs up the process, so it lives as long as we do
    _master: Box<dyn MasterPty + Send>,
    streams: PtyStreams,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    exit_code: Option<u32>,
}

impl std::fmt::Debug for PtyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtyTransport")
            .field("pid", &self.pid)
            .field("started_at", &self.started_at)
            .field("exit_code", &self.exit_code)
            .finish()
    }
}

impl PtyTransport {
    /// When the process was started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Exit code, once the process has been reaped
    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }
}

#[async_trait]
impl Transport for PtyTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.streams.write(data)
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        self.streams.read().await
    }

    fn try_recv(&mut self) -> TryRecv {
        self.streams.try_read_now()
    }

    fn is_running(&mut self) -> bool {
        if self.exit_code.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!("FriCAS process exited with code {}", status.exit_code());
                self.exit_code = Some(status.exit_code());
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Failed to query process status: {}", e);
                false
            }
        }
    }

    fn interrupt(&mut self) -> Result<()> {
        match self.pid {
            Some(pid) if cfg!(unix) => send_signal(pid, Signal::Interrupt),
            _ => self.send(b"\x03"),
        }
    }

    fn terminate(&mut self) -> Result<()> {
        if let Err(e) = self.child.kill() {
            // Already gone is fine; anything else is worth a signal attempt
            debug!("Child kill failed: {}", e);
            if let Some(pid) = self.pid {
                if cfg!(unix) {
                    return send_signal(pid, Signal::Kill);
                }
            }
        }
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Spawn the process described by `config` in a fresh PTY
pub fn spawn_pty_process(config: &SpawnConfig) -> Result<PtyTransport> {
    let pty_system = native_pty_system();

    let pair = pty_system
        .openpty(config.size)
        .map_err(|e| Error::PtyCreationFailed {
            command: config.program.clone(),
            reason: e.to_string(),
        })?;

    let mut cmd_builder = CommandBuilder::new(&config.program);
    cmd_builder.args(&config.args);

    if !config.inherit_env {
        cmd_builder.env_clear();
    }
    for (key, value) in &config.env_vars {
        cmd_builder.env(key, value);
    }

    if let Some(dir) = &config.working_directory {
        cmd_builder.cwd(dir);
    }

    let child = pair
        .slave
        .spawn_command(cmd_builder)
        .map_err(|e| Error::ProcessSpawnError {
            command: config.command_line(),
            reason: e.to_string(),
        })?;

    let pid = child.process_id();
    info!("Started '{}' (pid {:?})", config.command_line(), pid);

    let PtyPair { master, slave } = pair;
    // Only the child should hold the slave side, otherwise EOF never arrives
    drop(slave);

    let streams = create_pty_streams(master.as_ref())?;

    Ok(PtyTransport {
        child,
        _master: master,
        streams,
        pid,
        started_at: Utc::now(),
        exit_code: None,
    })
}

/// Create reader/writer threads over the PTY master
fn create_pty_streams(master: &(dyn MasterPty + Send)) -> Result<PtyStreams> {
    let mut master_reader = master
        .try_clone_reader()
        .map_err(|e| Error::PtyReaderCloneFailed {
            reason: e.to_string(),
        })?;
    let mut master_writer = master
        .take_writer()
        .map_err(|e| Error::PtyWriterTakeFailed {
            reason: e.to_string(),
        })?;

    // PTY output -> async consumer
    let (tx_async_out, rx_async_out) = unbounded_channel::<Vec<u8>>();
    // Session -> PTY writer thread
    let (tx_stdin, rx_stdin) = channel::<Vec<u8>>();

    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 5;

        loop {
            match master_reader.read(&mut buf) {
                Ok(0) => {
                    debug!("PTY read EOF - process terminated");
                    break;
                }
                Ok(n) => {
                    consecutive_errors = 0;
                    if tx_async_out.send(buf[..n].to_vec()).is_err() {
                        debug!("PTY read: receiver dropped, stopping reader thread");
                        break;
                    }
                }
                Err(e) => match e.kind() {
                    std::io::ErrorKind::Interrupted => continue,
                    std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(10));
                        continue;
                    }
                    _ => {
                        consecutive_errors += 1;
                        // EIO is what Linux reports once the child side hangs up
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS
                            || e.raw_os_error() == Some(5)
                        {
                            debug!("PTY reader stopping: {}", e);
                            break;
                        }
                        warn!(
                            "PTY read error ({}): {} (attempt {}/{})",
                            e.kind(),
                            e,
                            consecutive_errors,
                            MAX_CONSECUTIVE_ERRORS
                        );
                        thread::sleep(Duration::from_millis(50));
                    }
                },
            }
        }
        debug!("PTY reader thread exiting");
    });

    thread::spawn(move || {
        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 3;

        while let Ok(data) = rx_stdin.recv() {
            loop {
                match master_writer.write_all(&data) {
                    Ok(()) => {
                        consecutive_errors = 0;
                        if let Err(e) = master_writer.flush() {
                            debug!("PTY flush error: {}", e);
                        }
                        break;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        consecutive_errors += 1;
                        warn!(
                            "PTY write error ({}): {} (consecutive errors: {}/{})",
                            e.kind(),
                            e,
                            consecutive_errors,
                            MAX_CONSECUTIVE_ERRORS
                        );
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            error!("PTY write: too many consecutive errors, stopping writer thread");
                            return;
                        }
                        break;
                    }
                }
            }
        }
        debug!("PTY writer thread exiting");
    });

    Ok(PtyStreams::from_channels(rx_async_out, tx_stdin))
}
