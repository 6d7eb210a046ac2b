//! FriCAS sessions
//!
//! A [`Session`] owns one running process, its interactive transcript and
//! everything learned from its output. It is shared as `Arc<Session>`;
//! the presentation layer calls [`Session::poll`] to pump output and
//! receive [`SessionEvent`]s, and the dispatcher methods to send commands.

pub mod dispatcher;
pub mod redirect;
pub mod registry;
pub mod transcript;

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::Config;
use crate::directory::{self, DirectoryTracker};
use crate::error::{Error, Result};
use crate::pty::{spawn_pty_process, SpawnConfig, Transport, TryRecv};
use crate::terminal::{
    CompileOutcome, EchoSuppressor, FilterChain, FilterEvent, OutputDecoder, OutputScanner,
    PromptKind,
};

pub use redirect::{CaptureSink, RedirectOptions};
pub use registry::SessionRegistry;
pub use transcript::Transcript;

use redirect::RedirectCapture;

/// Something the presentation layer should react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Text inserted into the transcript
    Output(String),
    /// The process is waiting for input
    Prompt(PromptKind),
    /// The cached working directory changed
    DirectoryChanged(PathBuf),
    /// A `)compile` finished
    CompilationFinished(CompileOutcome),
    /// Message for the user
    Notice(String),
    /// The process is gone
    Exited,
}

/// Mutable session state, guarded by one lock
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) transcript: Transcript,
    pub(crate) directory: DirectoryTracker,
    pub(crate) redirect: Option<RedirectCapture>,
    /// Interactive commands (plus the startup banner) still owed a prompt
    pub(crate) awaiting_prompts: usize,
    pub(crate) events: VecDeque<SessionEvent>,
    pub(crate) echo: EchoSuppressor,
    decoder: OutputDecoder,
    scanner: OutputScanner,
    filter_events: VecDeque<FilterEvent>,
    last_compilation: Option<CompileOutcome>,
    last_prompt: Option<PromptKind>,
    exited: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            directory: DirectoryTracker::new(),
            redirect: None,
            awaiting_prompts: 1,
            events: VecDeque::new(),
            echo: EchoSuppressor::new(),
            decoder: OutputDecoder::new(),
            scanner: OutputScanner::new(),
            filter_events: VecDeque::new(),
            last_compilation: None,
            last_prompt: None,
            exited: false,
        }
    }

    /// Route one chunk of process output
    fn ingest(&mut self, chunk: &[u8], filters: &FilterChain, strip_echo: bool) {
        let text = self.decoder.decode(chunk);
        let text = if strip_echo {
            self.echo.filter(&text)
        } else {
            text
        };
        if text.is_empty() {
            return;
        }

        if let Some(capture) = self.redirect.as_mut().filter(|c| !c.is_complete()) {
            capture.push(&text, filters.prompt());
            return;
        }

        self.transcript.insert_output(&text);
        self.events.push_back(SessionEvent::Output(text.clone()));

        for event in self.scanner.feed(&text, filters) {
            if let FilterEvent::Prompt(kind) = event {
                self.awaiting_prompts = self.awaiting_prompts.saturating_sub(1);
                self.last_prompt = Some(kind);
                self.events.push_back(SessionEvent::Prompt(kind));
            }
            self.filter_events.push_back(event);
        }
    }

    fn mark_exited(&mut self, session: &str) {
        if self.exited {
            return;
        }
        info!("FriCAS process for session '{}' exited", session);
        self.exited = true;
        self.redirect = None;
        let held = self.echo.clear();
        if !held.is_empty() {
            self.transcript.insert_output(&held);
        }
        self.events.push_back(SessionEvent::Exited);
    }
}

/// One running FriCAS process and its interactive state
pub struct Session {
    id: String,
    name: String,
    config: Config,
    filters: FilterChain,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    transport: AsyncMutex<Box<dyn Transport>>,
    /// Serialises submissions against redirects
    dispatch: AsyncMutex<()>,
    redirect_in_flight: AtomicBool,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pid", &self.pid)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Session {
    /// Launch the configured FriCAS program in a PTY
    pub async fn start(name: impl Into<String>, config: Config) -> Result<Self> {
        config.validate()?;
        let spawn = SpawnConfig::from(&config.process);
        let transport = spawn_pty_process(&spawn)?;
        Self::with_transport(name, config, Box::new(transport)).await
    }

    /// Build a session over an already running process
    pub async fn with_transport(
        name: impl Into<String>,
        config: Config,
        transport: Box<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let filters = FilterChain::new(&config.prompts)?;
        let session = Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            pid: transport.pid(),
            started_at: Utc::now(),
            filters,
            transport: AsyncMutex::new(transport),
            dispatch: AsyncMutex::new(()),
            redirect_in_flight: AtomicBool::new(false),
            state: Mutex::new(SessionState::new()),
            config,
        };

        info!(
            "Session '{}' ({}) started, pid {:?}",
            session.name, session.id, session.pid
        );

        if let Some(preamble) = session.config.process.preamble.clone() {
            session.submit(&preamble).await?;
        }

        Ok(session)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Last directory the process announced
    pub fn working_directory(&self) -> Option<PathBuf> {
        self.lock_state().directory.current().map(PathBuf::from)
    }

    pub fn directory_update_pending(&self) -> bool {
        self.lock_state().directory.is_pending()
    }

    /// Copy of the interactive transcript
    pub fn transcript(&self) -> Transcript {
        self.lock_state().transcript.clone()
    }

    pub fn last_compilation(&self) -> Option<CompileOutcome> {
        self.lock_state().last_compilation.clone()
    }

    pub fn last_prompt(&self) -> Option<PromptKind> {
        self.lock_state().last_prompt
    }

    /// Whether every interactive command has been answered with a prompt
    pub fn is_idle(&self) -> bool {
        self.lock_state().awaiting_prompts == 0
    }

    pub fn is_redirect_in_flight(&self) -> bool {
        self.redirect_in_flight.load(Ordering::Acquire)
    }

    pub async fn is_running(&self) -> bool {
        if self.lock_state().exited {
            return false;
        }
        let running = self.transport.lock().await.is_running();
        if !running {
            self.lock_state().mark_exited(&self.name);
        }
        running
    }

    pub(crate) async fn ensure_running(&self) -> Result<()> {
        if self.is_running().await {
            Ok(())
        } else {
            Err(self.not_running())
        }
    }

    fn not_running(&self) -> Error {
        Error::ProcessNotRunning {
            session: self.name.clone(),
        }
    }

    /// Interrupt the current computation
    pub async fn interrupt(&self) -> Result<()> {
        self.ensure_running().await?;
        debug!("Interrupting session '{}'", self.name);
        self.transport.lock().await.interrupt()
    }

    /// Kill the process
    pub async fn terminate(&self) -> Result<()> {
        let result = self.transport.lock().await.terminate();
        self.lock_state().mark_exited(&self.name);
        result
    }

    /// Pump available output and return what happened since the last call
    ///
    /// A prompt arriving while a directory update is pending triggers the
    /// directory query here.
    pub async fn poll(&self) -> Vec<SessionEvent> {
        self.drain_available().await;
        self.process_filter_events().await;
        self.lock_state().events.drain(..).collect()
    }

    async fn drain_available(&self) {
        let mut transport = self.transport.lock().await;
        loop {
            match transport.try_recv() {
                TryRecv::Data(chunk) => self.ingest(&chunk),
                TryRecv::Empty => break,
                TryRecv::Closed => {
                    self.lock_state().mark_exited(&self.name);
                    break;
                }
            }
        }
    }

    async fn process_filter_events(&self) {
        loop {
            let Some(event) = self.lock_state().filter_events.pop_front() else {
                break;
            };

            match event {
                FilterEvent::Prompt(_) => {
                    let update_due = {
                        let mut state = self.lock_state();
                        !self.is_redirect_in_flight() && state.directory.take_pending()
                    };
                    if update_due {
                        if let Err(e) = self.force_directory_update(true).await {
                            warn!("Directory update after prompt failed: {}", e);
                            if matches!(e, Error::IllegalConcurrentRedirect { .. }) {
                                self.lock_state().directory.mark_pending();
                            }
                        }
                    }
                }
                FilterEvent::DirectoryAnnounced(raw) => {
                    let mut state = self.lock_state();
                    let path = directory::normalize_directory(&raw, state.directory.current());
                    if state.directory.record(path.clone()) {
                        state.events.push_back(SessionEvent::DirectoryChanged(path));
                    }
                }
                FilterEvent::Compilation(outcome) => {
                    match &outcome {
                        CompileOutcome::Succeeded { constructor, .. } => {
                            info!("Compiled {}", constructor)
                        }
                        CompileOutcome::Failed { message } => warn!("Compilation failed: {}", message),
                    }
                    let mut state = self.lock_state();
                    state.last_compilation = Some(outcome.clone());
                    state
                        .events
                        .push_back(SessionEvent::CompilationFinished(outcome));
                }
            }
        }
    }

    fn ingest(&self, chunk: &[u8]) {
        self.lock_state()
            .ingest(chunk, &self.filters, self.config.process.process_echoes);
    }

    /// Read output until `done` holds or `deadline` passes
    pub(crate) async fn pump_until<F>(&self, command: &str, deadline: Instant, done: F) -> Result<()>
    where
        F: Fn(&SessionState) -> bool,
    {
        let slice = self.config.redirect.poll_slice();
        loop {
            if done(&*self.lock_state()) {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout {
                    command: command.to_string(),
                    duration: self.config.redirect.timeout(),
                });
            }
            let wait = (deadline - now).min(slice);

            let mut transport = self.transport.lock().await;
            match tokio::time::timeout(wait, transport.recv()).await {
                Ok(Some(chunk)) => {
                    self.ingest(&chunk);
                    // Take whatever else is already buffered
                    while let TryRecv::Data(chunk) = transport.try_recv() {
                        self.ingest(&chunk);
                    }
                }
                Ok(None) => {
                    self.lock_state().mark_exited(&self.name);
                    return Err(self.not_running());
                }
                Err(_) => {}
            }
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
