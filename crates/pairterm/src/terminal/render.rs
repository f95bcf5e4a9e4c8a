//! Frame rendering to ratatui text.
//!
//! Sanitized frames carry only printable text and SGR styling, which
//! `ansi-to-tui` turns into styled spans. Anything that cannot be converted
//! shows a placeholder instead of the pane going blank.

use ansi_to_tui::IntoText;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Text};

use super::screen::{Frame, FrameError};

/// Convert a frame (or the reason there is none) into pane text.
pub fn frame_text(frame: Result<&Frame, &FrameError>) -> Text<'static> {
    let frame = match frame {
        Ok(frame) => frame,
        Err(err) => return unavailable(&err.to_string()),
    };
    match frame.text.as_bytes().into_text() {
        Ok(text) => text,
        Err(err) => unavailable(&err.to_string()),
    }
}

fn unavailable(reason: &str) -> Text<'static> {
    tracing::warn!(reason, "frame rendered as placeholder");
    Text::from(Line::styled(
        format!("[frame unavailable: {reason}]"),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    ))
}

/// Marker line shown above a truncated frame.
pub fn hidden_lines_marker(hidden: usize) -> Option<Line<'static>> {
    (hidden > 0).then(|| {
        Line::styled(
            format!("⋮ ({hidden} more lines above)"),
            Style::default().fg(Color::DarkGray),
        )
    })
}
