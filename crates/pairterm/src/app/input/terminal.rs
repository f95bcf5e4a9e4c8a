use std::sync::mpsc::Sender;
use std::thread;

use crossterm::event::KeyEvent;

use crate::app::render::terminal_inner_size;
use crate::app::state::App;
use crate::events::AppEvent;
use crate::history::{self, TimerTicket};
use crate::terminal::{key_event_to_bytes, SessionState};

pub(super) fn process_terminal_output(app: &mut App, id: u64, bytes: &[u8]) {
    if id != app.session.id() {
        return;
    }
    app.session.process_bytes(bytes);
    let chunk = String::from_utf8_lossy(bytes);
    app.tracker.on_output(&chunk);
    // Runners drop their receiver once they have what they need.
    app.command_taps
        .retain(|tap| tap.send(chunk.to_string()).is_ok());
}

/// Everything written to the shell goes through here so the tracker sees it.
pub(super) fn write_to_shell(app: &mut App, bytes: &[u8]) {
    app.session.write_bytes(bytes);
    if let Some(ticket) = app.tracker.on_keystrokes(bytes) {
        arm_quiescence_timer(app, ticket);
    }
}

pub(super) fn forward_key(app: &mut App, key: KeyEvent) {
    if let Some(bytes) = key_event_to_bytes(key) {
        write_to_shell(app, &bytes);
    }
}

fn arm_quiescence_timer(app: &App, ticket: TimerTicket) {
    let tx = app.event_tx.clone();
    let id = app.session.id();
    thread::spawn(move || {
        thread::sleep(ticket.delay);
        let _ = tx.send(AppEvent::QuiescenceElapsed(id, ticket.generation));
    });
}

/// Resize the shell right away; the next draw refines it to the real pane.
pub(super) fn handle_resize(app: &mut App, rows: u16, cols: u16) {
    let (pty_rows, pty_cols) = terminal_inner_size(rows, cols);
    app.session.resize(pty_rows, pty_cols);
}

pub(super) fn handle_quiescence(app: &mut App, id: u64, generation: u64) {
    if id != app.session.id() {
        return;
    }
    if let Some(record) = app.tracker.on_quiescence(generation) {
        let input = record.input.clone();
        let output_chars = record.output.chars().count();
        let mut history = history::lock(&app.history);
        history.push(record);
        tracing::info!(%input, output_chars, stored = history.len(), "command recorded");
    }
}

/// Type an agent command into the shell and stream its output back.
pub(super) fn run_agent_command(app: &mut App, command: &str, output_tx: Sender<String>) {
    if app.session.state() == SessionState::Terminated {
        // Dropping the sender tells the runner the session is gone.
        return;
    }
    tracing::info!(%command, "running agent command in shell");
    app.command_taps.push(output_tx);
    let mut bytes = command.as_bytes().to_vec();
    bytes.push(b'\r');
    write_to_shell(app, &bytes);
}

pub(super) fn handle_pty_exit(app: &mut App, id: u64) {
    if id != app.session.id() {
        return;
    }
    app.session.mark_exited();
    app.tracker.cancel();
    app.command_taps.clear();
    app.should_quit = true;
}
