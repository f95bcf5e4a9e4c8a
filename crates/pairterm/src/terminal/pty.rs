//! PTY spawning and session lifecycle.
//!
//! A session owns the shell process, the PTY master and writer, and the
//! terminal state machine fed from its output. A background thread reads
//! the PTY and forwards chunks to the event loop as `AppEvent::PtyOutput`;
//! EOF becomes `AppEvent::PtyExit`.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use thiserror::Error;

use crate::events::AppEvent;
use crate::logging::Logger;

use super::screen::{Frame, FrameError, TerminalStateMachine};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to open pty: {0}")]
    Open(String),
    #[error("failed to spawn `{shell}`: {message}")]
    Spawn { shell: String, message: String },
    #[error("failed to attach to pty: {0}")]
    Attach(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated,
}

/// What to run inside the PTY.
#[derive(Debug, Clone)]
pub struct ShellSpec {
    pub shell: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

pub struct PtySession {
    id: u64,
    state: SessionState,
    screen: TerminalStateMachine,
    writer: Box<dyn Write + Send>,
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    rows: u16,
    cols: u16,
}

impl PtySession {
    /// Spawn the shell and start the reader thread.
    ///
    /// There is no fallback shell: a failure here is fatal to the caller.
    pub fn spawn(
        id: u64,
        spec: &ShellSpec,
        rows: u16,
        cols: u16,
        output_tx: Sender<AppEvent>,
        logger: &Logger,
    ) -> Result<Self, SpawnError> {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let _log = logger.enter();
        let pair = native_pty_system()
            .openpty(pty_size(rows, cols))
            .map_err(|err| SpawnError::Open(err.to_string()))?;

        let mut cmd = CommandBuilder::new(&spec.shell);
        cmd.args(spec.args.iter().map(String::as_str));
        cmd.cwd(&spec.cwd);
        cmd.env("TERM", "xterm-256color");
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|err| SpawnError::Spawn {
                shell: spec.shell.clone(),
                message: err.to_string(),
            })?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|err| SpawnError::Attach(err.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|err| SpawnError::Attach(err.to_string()))?;

        tracing::info!(session = id, shell = %spec.shell, rows, cols, "pty spawned");
        spawn_reader(id, reader, output_tx, logger.clone());

        Ok(Self {
            id,
            state: SessionState::Running,
            screen: TerminalStateMachine::new(rows, cols),
            writer,
            master: pair.master,
            child,
            rows,
            cols,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// PTY geometry as `(rows, cols)`.
    pub fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    pub fn screen(&self) -> &TerminalStateMachine {
        &self.screen
    }

    /// Feed output read from this session's PTY.
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        self.screen.feed(bytes);
    }

    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.screen.cursor()
    }

    pub fn frame(&self, visible: usize) -> Result<Frame, FrameError> {
        self.screen.frame(visible)
    }

    /// Resize both the OS pty and the emulator model.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if (rows, cols) == (self.rows, self.cols) {
            return;
        }
        self.rows = rows;
        self.cols = cols;
        self.screen.resize(rows, cols);
        if let Err(err) = self.master.resize(pty_size(rows, cols)) {
            tracing::warn!(session = self.id, error = %err, "pty resize failed");
        }
        debug_assert_eq!(self.screen.size(), (self.rows, self.cols));
    }

    /// Write input bytes (keystrokes or injected commands) to the shell.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() || self.state == SessionState::Terminated {
            return;
        }
        if let Err(err) = self
            .writer
            .write_all(bytes)
            .and_then(|()| self.writer.flush())
        {
            tracing::warn!(session = self.id, error = %err, "pty write failed");
        }
    }

    /// Record that the reader saw EOF.
    pub fn mark_exited(&mut self) {
        if self.state != SessionState::Terminated {
            tracing::info!(session = self.id, "pty exited");
        }
        self.state = SessionState::Terminated;
    }

    /// Stop the shell process.
    pub fn kill(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        if let Err(err) = self.child.kill() {
            tracing::warn!(session = self.id, error = %err, "pty kill failed");
        }
        self.state = SessionState::Terminated;
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        self.kill();
    }
}

fn pty_size(rows: u16, cols: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

fn spawn_reader(
    id: u64,
    mut reader: Box<dyn Read + Send>,
    output_tx: Sender<AppEvent>,
    logger: Logger,
) {
    thread::spawn(move || {
        let _log = logger.enter();
        let mut buffer = [0u8; 8192];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(size) => {
                    if output_tx
                        .send(AppEvent::PtyOutput(id, buffer[..size].to_vec()))
                        .is_err()
                    {
                        return;
                    }
                }
                Err(err) => {
                    tracing::debug!(session = id, error = %err, "pty read ended");
                    break;
                }
            }
        }
        let _ = output_tx.send(AppEvent::PtyExit(id));
    });
}
