//! Command Dispatcher
//!
//! Two ways to send a command:
//!
//! * [`Session::submit`] behaves as if the user typed the command at the
//!   prompt. Whatever the user was composing is lifted out, the command is
//!   committed and sent, and the composed text is put back untouched.
//! * [`Session::query_and_capture`] runs the command on the side and
//!   diverts its output into a [`CaptureSink`]. Only one such query may be
//!   outstanding per session.

use std::path::PathBuf;
use tokio::time::Instant;

use super::redirect::{CaptureSink, RedirectCapture, RedirectGuard, RedirectOptions};
use super::{Session, SessionEvent};
use crate::directory::{self, DIRECTORY_QUERY};
use crate::error::{Error, Result};
use crate::terminal::InputEvent;

/// Remove every trailing line terminator
pub fn strip_trailing_newlines(command: &str) -> &str {
    command.trim_end_matches(['\n', '\r'])
}

impl Session {
    /// Send `command` as interactive input
    ///
    /// Fails with [`Error::ProcessNotRunning`] before touching any state
    /// when the process is gone.
    pub async fn submit(&self, command: &str) -> Result<()> {
        self.ensure_running().await?;
        let _dispatch = self.dispatch.lock().await;
        self.submit_locked(command, true).await
    }

    /// Append user typing to the pending input
    pub fn type_input(&self, text: &str) {
        self.lock_state().transcript.type_text(text);
    }

    /// Input typed but not yet sent
    pub fn pending_input(&self) -> String {
        self.lock_state().transcript.pending().to_string()
    }

    /// Send whatever the user has typed, as if they pressed return
    pub async fn send_input(&self) -> Result<()> {
        self.ensure_running().await?;
        let _dispatch = self.dispatch.lock().await;
        let input = self.lock_state().transcript.take_pending();
        let result = self.submit_locked(&input, true).await;
        if result.is_err() {
            self.lock_state().transcript.restore_pending(&input);
        }
        result
    }

    /// Commit and send one command; the dispatch lock must be held
    ///
    /// State only changes once the bytes are handed to the transport.
    /// Output is read under the transport lock, so none of the reply can be
    /// ingested before the bookkeeping below is in place.
    pub(crate) async fn submit_locked(&self, command: &str, classify: bool) -> Result<()> {
        let command = strip_trailing_newlines(command);
        let lines = command.split('\n').count();

        let mut transport = self.transport.lock().await;
        debug!("Submitting '{}' to session '{}'", command, self.name);
        let mut data = command.as_bytes().to_vec();
        data.push(b'\n');
        transport.send(&data)?;

        {
            let mut state = self.lock_state();
            if classify
                && self
                    .filters
                    .classify_input(command)
                    .contains(&InputEvent::DirectoryMayChange)
            {
                state.directory.mark_pending();
            }

            let pending = state.transcript.take_pending();
            state.transcript.commit_line(command);
            state.transcript.restore_pending(&pending);

            state.awaiting_prompts += lines;
            if self.config.process.process_echoes {
                for line in command.split('\n') {
                    state.echo.expect(line);
                }
            }
        }

        Ok(())
    }

    /// Run `command` and capture its output, up to the next prompt, in `sink`
    ///
    /// Waits for earlier interactive commands to finish first. The captured
    /// text never includes the closing prompt. Directory-changing commands
    /// sent this way are not tracked.
    pub async fn query_and_capture(
        &self,
        command: &str,
        sink: &mut CaptureSink,
        options: RedirectOptions,
    ) -> Result<()> {
        let command = strip_trailing_newlines(command);
        self.ensure_running().await?;

        let Some(_guard) = RedirectGuard::acquire(&self.redirect_in_flight) else {
            warn!(
                "Rejecting '{}': a redirect is already running on session '{}'",
                command, self.name
            );
            return Err(Error::IllegalConcurrentRedirect {
                session: self.name.clone(),
                command: command.to_string(),
            });
        };
        let _dispatch = self.dispatch.lock().await;

        let deadline = Instant::now() + self.config.redirect.timeout();
        self.pump_until(command, deadline, |state| state.awaiting_prompts == 0)
            .await?;

        debug!("Redirecting '{}' on session '{}'", command, self.name);
        {
            let mut transport = self.transport.lock().await;
            let mut data = command.as_bytes().to_vec();
            data.push(b'\n');
            transport.send(&data)?;

            let mut state = self.lock_state();
            if options.echo_command {
                let echoed = format!("{}\n", command);
                state.transcript.insert_output(&echoed);
                state.events.push_back(SessionEvent::Output(echoed));
            }
            state.redirect = Some(RedirectCapture::new(command));
            if self.config.process.process_echoes {
                state.echo.expect(command);
            }
        }

        let waited = self
            .pump_until(command, deadline, |state| {
                state.redirect.as_ref().map_or(true, |c| c.is_complete())
            })
            .await;

        let capture = {
            let mut state = self.lock_state();
            let capture = state.redirect.take();
            if waited.is_err() && capture.is_some() {
                // The prompt will still come; let the transcript have it
                state.awaiting_prompts += 1;
            }
            capture
        };

        if let Err(e) = waited {
            warn!("Abandoning redirect of '{}': {}", command, e);
            return Err(e);
        }

        let (output, prompt) = capture.map(RedirectCapture::finish).unwrap_or_default();
        sink.append(&output);
        if options.display {
            sink.request_display();
        }

        if options.echo_result {
            let mut state = self.lock_state();
            for text in [output, prompt] {
                if !text.is_empty() {
                    state.transcript.insert_output(&text);
                    state.events.push_back(SessionEvent::Output(text));
                }
            }
        } else if options.echo_command {
            // Get a fresh prompt under the echoed command
            self.submit_locked("", false).await?;
        }

        Ok(())
    }

    /// Ask the process for its working directory and cache the answer
    ///
    /// Returns `None`, leaving the cache alone, when the reply has no
    /// directory announcement in it.
    pub async fn force_directory_update(&self, no_message: bool) -> Result<Option<PathBuf>> {
        let mut sink = CaptureSink::scratch();
        self.query_and_capture(DIRECTORY_QUERY, &mut sink, RedirectOptions::quiet())
            .await?;

        let raw = match directory::parse_announcement(sink.text()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Session '{}': {}", self.name, e);
                return Ok(None);
            }
        };

        let mut state = self.lock_state();
        let path = directory::normalize_directory(&raw, state.directory.current());
        state.directory.take_pending();
        if state.directory.record(path.clone()) {
            info!("Session '{}' is in {}", self.name, path.display());
            state
                .events
                .push_back(SessionEvent::DirectoryChanged(path.clone()));
        }
        if !no_message {
            state
                .events
                .push_back(SessionEvent::Notice(format!("FriCAS directory: {}", path.display())));
        }

        Ok(Some(path))
    }
}
