//! UI rendering methods.
//!
//! Handles all drawing for the TUI:
//! - Main layout (terminal pane | conversation pane, status line)
//! - Terminal content from the PTY frame
//! - Conversation entries and the prompt box

mod chat_pane;
mod layout;
mod terminal_pane;

use ratatui::layout::{Constraint, Direction, Layout};

use crate::terminal::viewport::visible_rows;

use super::state::{App, TERMINAL_PANE_PERCENT};

/// Main render entry point. Called each frame by the event loop.
pub fn render(app: &mut App, frame: &mut ratatui::Frame) {
    let area = frame.area();
    let status_height = 1u16;

    // Vertical layout: panes | status line
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(status_height)])
        .split(area);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(TERMINAL_PANE_PERCENT),
            Constraint::Percentage(100 - TERMINAL_PANE_PERCENT),
        ])
        .split(rows[0]);

    terminal_pane::render_terminal_pane(app, frame, panes[0]);
    chat_pane::render_chat_pane(app, frame, panes[1]);
    layout::render_status_line(app, frame, rows[1]);
}

/// PTY geometry `(rows, cols)` for a screen of `rows` x `cols`, before the
/// first draw has measured the real pane.
pub fn terminal_inner_size(rows: u16, cols: u16) -> (u16, u16) {
    let pane_width = u32::from(cols) * u32::from(TERMINAL_PANE_PERCENT) / 100;
    let inner_rows = visible_rows(rows) as u16;
    let inner_cols = (pane_width as u16).saturating_sub(2);
    (inner_rows.max(1), inner_cols.max(1))
}
