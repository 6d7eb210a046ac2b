//! Scripted FriCAS process
//!
//! Answers the handful of system commands the session layer relies on
//! the way FriCAS phrases them, keeps its own working directory, and can be
//! told to misbehave (no directory marker, never prompting, dying).

use async_trait::async_trait;
use fricas_session::error::{Error, Result};
use fricas_session::pty::{Transport, TryRecv};
use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Behaviour switches for the mock
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Directory the process starts in
    pub cwd: PathBuf,
    /// Echo input back like a PTY in canonical mode
    pub echo: bool,
    /// Include "default directory is" in `)cd` replies
    pub announce_directory: bool,
    /// Put the announced directory on its own line
    pub wrap_directory: bool,
    /// Split every reply into chunks of this many bytes
    pub chunk_size: Option<usize>,
    /// Commands that never produce a prompt
    pub hanging_commands: Vec<String>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("/home/user"),
            echo: true,
            announce_directory: true,
            wrap_directory: false,
            chunk_size: None,
            hanging_commands: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct MockState {
    options: MockOptions,
    cwd: PathBuf,
    prompt_number: u32,
    output: VecDeque<Vec<u8>>,
    received: Vec<String>,
    compiled: Vec<(PathBuf, PathBuf)>,
    interrupts: usize,
    alive: bool,
    fail_sends: bool,
}

impl MockState {
    fn queue(&mut self, text: &str) {
        let bytes = text.as_bytes();
        match self.options.chunk_size {
            Some(size) if size > 0 => {
                for chunk in bytes.chunks(size) {
                    self.output.push_back(chunk.to_vec());
                }
            }
            _ => self.output.push_back(bytes.to_vec()),
        }
    }

    fn prompt(&self) -> String {
        format!("({}) -> ", self.prompt_number)
    }

    fn cwd_display(&self) -> String {
        format!("{}/", self.cwd.display().to_string().trim_end_matches('/'))
    }

    fn change_directory(&mut self, arg: &str) {
        let target = if Path::new(arg).is_absolute() {
            PathBuf::from(arg)
        } else {
            self.cwd.join(arg)
        };
        let mut normalized = PathBuf::new();
        for component in target.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other),
            }
        }
        self.cwd = normalized;
    }

    /// How many times `line` has been received, this one included
    fn times_received(&self, line: &str) -> usize {
        self.received.iter().filter(|seen| seen.as_str() == line).count()
    }

    fn respond(&mut self, line: &str) {
        self.received.push(line.to_string());
        let reply_number = self.times_received(line);
        if self.options.echo {
            self.queue(&format!("{}\r\n", line));
        }

        let command = line.trim();
        if self.options.hanging_commands.iter().any(|c| c == command) {
            return;
        }

        let reply = if command.is_empty() {
            String::new()
        } else if let Some(arg) = system_argument(command, "cd") {
            if !arg.is_empty() {
                self.change_directory(arg);
            }
            if self.options.announce_directory && self.options.wrap_directory {
                format!(
                    "   The current FriCAS default directory is\r\n      {} \r\n",
                    self.cwd_display()
                )
            } else if self.options.announce_directory {
                format!(
                    "   The current FriCAS default directory is {} \r\n",
                    self.cwd_display()
                )
            } else {
                "   Sorry, I cannot tell where you are.\r\n".to_string()
            }
        } else if let Some(file) = system_argument(command, "read") {
            format!("   Reading {}\r\n", file)
        } else if let Some(file) = system_argument(command, "compile") {
            let source = PathBuf::from(file);
            self.compiled.push((self.cwd.clone(), source.clone()));
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().to_uppercase())
                .unwrap_or_default();
            format!(
                "   Compiling FriCAS source code from file \r\n      {} using old system compiler.\r\n   {} is now explicitly exposed in frame initial \r\n   {} will be automatically loaded when needed from \r\n      {}{}.NRLIB/{}\r\n",
                file,
                stem,
                stem,
                self.cwd_display(),
                stem,
                stem
            )
        } else if let Some(name) = system_argument(command, "show") {
            format!(
                "\r\n {} is a domain constructor\r\n ------------------------------- Operations --------------------------------\r\n ?*? : (%, %) -> %                     ?+? : (%, %) -> %\r\n Listing {}\r\n",
                name, reply_number
            )
        } else if let Some(rest) = system_argument(command, "display") {
            let name = rest.trim_start_matches("operation").trim();
            format!(
                "\r\nThere is one exposed function called {} :\r\n   [1] D -> Factored(D) from MultivariateFactorize\r\n Listing {}\r\n",
                name, reply_number
            )
        } else if command == ")lisp (break)" {
            self.queue("\r\nEntering debugger\r\n0] ");
            return;
        } else {
            let number = self.prompt_number;
            self.prompt_number += 1;
            format!(
                "\r\n   ({})  {}\r\n                                                    Type: Expression(Integer)\r\n",
                number, command
            )
        };

        let prompt = self.prompt();
        self.queue(&format!("{}{}", reply, prompt));
    }
}

/// Argument of `)keyword ...`, if `command` is that system command
fn system_argument<'a>(command: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = command.strip_prefix(')')?.strip_prefix(keyword)?;
    if rest.is_empty() || rest.starts_with(' ') {
        Some(rest.trim())
    } else {
        None
    }
}

/// Transport half, handed to the session
pub struct MockFricas {
    state: Arc<Mutex<MockState>>,
}

/// Inspection and control half, kept by the test
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockFricas {
    pub fn new(options: MockOptions) -> (Self, MockHandle) {
        let mut state = MockState {
            cwd: options.cwd.clone(),
            options,
            prompt_number: 1,
            output: VecDeque::new(),
            received: Vec::new(),
            compiled: Vec::new(),
            interrupts: 0,
            alive: true,
            fail_sends: false,
        };
        let banner = format!(
            "                 FriCAS Computer algebra system\r\n            Version: FriCAS 1.3.10\r\n{}",
            state.prompt()
        );
        state.queue(&banner);

        let state = Arc::new(Mutex::new(state));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockHandle { state },
        )
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Transport for MockFricas {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if !state.alive {
            return Err(Error::PtyInputSendFailed {
                reason: "process exited".to_string(),
            });
        }
        if state.fail_sends {
            return Err(Error::PtyInputSendFailed {
                reason: "writer thread stopped".to_string(),
            });
        }
        let text = String::from_utf8_lossy(data).into_owned();
        for line in text.split_terminator('\n') {
            state.respond(line);
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        let alive = {
            let mut state = self.lock();
            if let Some(chunk) = state.output.pop_front() {
                return Some(chunk);
            }
            state.alive
        };
        if !alive {
            return None;
        }
        // Nothing until the next send; callers wait with a timeout
        std::future::pending().await
    }

    fn try_recv(&mut self) -> TryRecv {
        let mut state = self.lock();
        match state.output.pop_front() {
            Some(chunk) => TryRecv::Data(chunk),
            None if state.alive => TryRecv::Empty,
            None => TryRecv::Closed,
        }
    }

    fn is_running(&mut self) -> bool {
        self.lock().alive
    }

    fn interrupt(&mut self) -> Result<()> {
        self.lock().interrupts += 1;
        Ok(())
    }

    fn terminate(&mut self) -> Result<()> {
        self.lock().alive = false;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        None
    }
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Every line the process has read, in order
    pub fn received(&self) -> Vec<String> {
        self.lock().received.clone()
    }

    /// How many times exactly `command` was sent
    pub fn count(&self, command: &str) -> usize {
        self.lock()
            .received
            .iter()
            .filter(|line| line.as_str() == command)
            .count()
    }

    pub fn cwd(&self) -> PathBuf {
        self.lock().cwd.clone()
    }

    /// (directory, file) of every `)compile`
    pub fn compiled(&self) -> Vec<(PathBuf, PathBuf)> {
        self.lock().compiled.clone()
    }

    pub fn interrupts(&self) -> usize {
        self.lock().interrupts
    }

    pub fn set_announce_directory(&self, announce: bool) {
        self.lock().options.announce_directory = announce;
    }

    /// Make every write fail while the process still looks alive
    pub fn set_fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Emit output nobody asked for
    pub fn emit(&self, text: &str) {
        self.lock().queue(text);
    }

    /// Simulate the process dying
    pub fn kill(&self) {
        self.lock().alive = false;
    }
}
