//! File logging through an explicitly passed handle.
//!
//! No global subscriber is installed. Each thread that logs calls
//! `Logger::enter` and keeps the guard for as long as it runs; the TUI owns
//! stdout, so everything goes to `<dir>/pairterm.log`.

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::dispatcher::DefaultGuard;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "pairterm.log";
const LOG_ENV: &str = "PAIRTERM_LOG";

#[derive(Clone, Default)]
pub struct Logger {
    dispatch: Option<Dispatch>,
    guard: Option<Arc<Mutex<Option<WorkerGuard>>>>,
    path: Option<PathBuf>,
}

impl Logger {
    /// Open the log file when logging is enabled by config or `PAIRTERM_LOG=1`.
    pub fn init(config: &LoggingConfig) -> io::Result<Self> {
        if !config.enabled && !env_enabled() {
            return Ok(Self::disabled());
        }
        fs::create_dir_all(&config.dir)?;
        let path = config.dir.join(LOG_FILE_NAME);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .with_thread_names(true)
            .finish();
        Ok(Self {
            dispatch: Some(Dispatch::new(subscriber)),
            guard: Some(Arc::new(Mutex::new(Some(guard)))),
            path: Some(path),
        })
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.dispatch.is_some()
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Make this logger the current thread's default until the guard drops.
    pub fn enter(&self) -> Option<DefaultGuard> {
        self.dispatch
            .as_ref()
            .map(tracing::dispatcher::set_default)
    }

    /// Flush buffered lines. Clones made before this keep a dispatch whose
    /// writer no longer drains.
    pub fn close(self) {
        if let Some(guard) = self.guard {
            let worker = guard
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take();
            drop(worker);
        }
    }
}

fn env_enabled() -> bool {
    matches!(
        env::var(LOG_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}
