use ratatui::layout::{Position, Rect};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;

use crate::terminal::{frame_text, hidden_lines_marker, SessionState};

use super::super::state::{App, Focus};
use super::layout::pane_block;

/// Render the shell frame, sized to the pane.
pub(super) fn render_terminal_pane(app: &mut App, frame: &mut ratatui::Frame, area: Rect) {
    let focused = app.focus == Focus::Terminal;
    let block = pane_block("Terminal", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    app.session.resize(inner.height, inner.width);
    let visible = inner.height as usize;
    let mut snapshot = app.session.frame(visible);
    // Make room for the marker line when anything is hidden.
    if matches!(&snapshot, Ok(shot) if shot.hidden_lines > 0) && visible > 1 {
        snapshot = app.session.frame(visible - 1);
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut hidden = 0;
    if let Ok(shot) = &snapshot {
        hidden = shot.hidden_lines;
        lines.extend(hidden_lines_marker(hidden));
    }
    lines.extend(frame_text(snapshot.as_ref()).lines);
    frame.render_widget(Paragraph::new(lines), inner);

    if focused && hidden == 0 && app.session.state() == SessionState::Running {
        if let Some((row, col)) = app.session.cursor() {
            if row < inner.height && col < inner.width {
                frame.set_cursor_position(Position::new(inner.x + col, inner.y + row));
            }
        }
    }
}
