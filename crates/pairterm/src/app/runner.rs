//! Application runner and event loop.
//!
//! Handles terminal setup/teardown and the main event loop.
//! Events are read from an mpsc channel and dispatched to handlers.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use crossterm::event::{self, Event};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::chat::{
    ApprovalGate, ChatOrchestrator, Conversation, OrchestratorConfig, ResponsesClient,
    INITIAL_INSTRUCTIONS, TOOL_FOLLOWUP_INSTRUCTIONS,
};
use crate::config::{load_config, Config};
use crate::events::AppEvent;
use crate::history::{CommandHistory, CommandTracker};
use crate::keymap::parse_key_chord;
use crate::logging::Logger;
use crate::terminal::{PtyCommandRunner, PtySession, ShellSpec};
use crate::tools::ToolRegistry;

use super::render::terminal_inner_size;
use super::state::{App, Focus, SHELL_SESSION_ID};

/// Entry point: load config, spawn the shell, and run the event loop.
pub fn run() -> io::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = load_config(&cwd);
    let logger = Logger::init(&config.logging).unwrap_or_else(|err| {
        eprintln!("pairterm: logging disabled: {err}");
        Logger::disabled()
    });
    let result = {
        let _log = logger.enter();
        for warning in &config.warnings {
            tracing::warn!(%warning, "config file skipped");
        }
        run_app(config, cwd, logger.clone())
    };
    if let Err(err) = &result {
        let _log = logger.enter();
        tracing::error!(error = %err, "pairterm exited with error");
    }
    logger.close();
    result
}

fn run_app(config: Config, cwd: PathBuf, logger: Logger) -> io::Result<()> {
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>();
    // Spawn before touching the screen so a bad shell leaves the tty intact.
    let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
    let mut app = App::new(config, cwd, logger, event_tx.clone(), rows, cols)?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    spawn_input_thread(event_tx);
    let result = run_loop(&mut terminal, &mut app, &event_rx);

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.session.kill();
    result
}

/// Main event loop: process events until quit.
fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    event_rx: &mpsc::Receiver<AppEvent>,
) -> io::Result<()> {
    terminal.clear()?;
    terminal.draw(|frame| super::render::render(app, frame))?;

    while !app.should_quit {
        let event = match event_rx.recv() {
            Ok(event) => event,
            Err(_) => break,
        };
        super::input::handle_event(app, event);
        // Drain any pending events before redraw
        while let Ok(event) = event_rx.try_recv() {
            super::input::handle_event(app, event);
        }

        terminal.draw(|frame| super::render::render(app, frame))?;
    }
    Ok(())
}

/// Spawn a thread to read terminal input events.
fn spawn_input_thread(sender: Sender<AppEvent>) {
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(Event::Key(key)) => {
                if sender.send(AppEvent::Input(key)).is_err() {
                    break;
                }
            }
            Ok(Event::Resize(cols, rows)) => {
                if sender.send(AppEvent::Resize(rows, cols)).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    });
}

impl App {
    /// Spawn the shell and wire the conversation stack to it.
    ///
    /// Failing to spawn the shell is fatal; there is no fallback.
    pub fn new(
        config: Config,
        cwd: PathBuf,
        logger: Logger,
        event_tx: Sender<AppEvent>,
        rows: u16,
        cols: u16,
    ) -> io::Result<Self> {
        let (pty_rows, pty_cols) = terminal_inner_size(rows, cols);
        let spec = ShellSpec {
            shell: config.terminal.shell.clone(),
            args: config.terminal.args.clone(),
            cwd,
            env: Vec::new(),
        };
        let session = PtySession::spawn(
            SHELL_SESSION_ID,
            &spec,
            pty_rows,
            pty_cols,
            event_tx.clone(),
            &logger,
        )
        .map_err(io::Error::other)?;

        let history = CommandHistory::with_capacity(config.history.capacity).shared();
        let runner = Arc::new(PtyCommandRunner::new(event_tx.clone()));
        let tools = Arc::new(ToolRegistry::standard(history.clone(), Some(runner)));
        tracing::info!(tools = ?tools.names(), "tool registry ready");
        let client = ResponsesClient::new(
            &config.model.base_url,
            config.model.api_key.clone(),
            config.model.timeout,
        )
        .map_err(io::Error::other)?;
        let orchestrator = Arc::new(ChatOrchestrator::new(
            Arc::new(client),
            tools,
            ApprovalGate::new(),
            OrchestratorConfig {
                model: config.model.model.clone(),
                timeout: config.model.timeout,
                max_tool_rounds: config.model.max_tool_rounds,
                instructions: INITIAL_INSTRUCTIONS.to_string(),
                followup_instructions: TOOL_FOLLOWUP_INSTRUCTIONS.to_string(),
            },
            logger.clone(),
        ));

        let toggle_chord = parse_key_chord(&config.keymap.toggle_focus);
        let quit_chord = parse_key_chord(&config.keymap.quit);
        let mut app = Self {
            focus: Focus::Terminal,
            should_quit: false,
            tracker: CommandTracker::new(config.history.quiescence),
            config,
            event_tx,
            session,
            history,
            conversation: Conversation::new(),
            orchestrator,
            prompt_input: String::new(),
            command_taps: Vec::new(),
            toggle_chord,
            quit_chord,
            status: None,
        };
        if app.config.model.api_key.is_none() {
            app.set_status("No API key: set PAIRTERM_API_KEY to talk to the assistant");
        }
        Ok(app)
    }
}
