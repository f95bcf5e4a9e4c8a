use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use super::super::state::{App, Focus};

/// Bordered pane; the focused one is highlighted.
pub(super) fn pane_block(title: &str, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    };
    let title_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border_style)
        .title(Span::styled(format!(" {title} "), title_style))
}

/// Render status line (focus indicator and message, key hints on the right).
pub(super) fn render_status_line(app: &App, frame: &mut ratatui::Frame, area: Rect) {
    let hints = format!(
        "{}: switch pane | {}: quit",
        keymap_label(&app.config.keymap.toggle_focus),
        keymap_label(&app.config.keymap.quit),
    );
    let width = area.width as usize;
    let hints_len = hints.chars().count();
    if width > hints_len + 1 {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(1),
                Constraint::Length((hints_len + 1) as u16),
            ])
            .split(area);
        frame.render_widget(Paragraph::new(status_line(app)), chunks[0]);
        let dim_style = Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM);
        let hints = Paragraph::new(Line::from(Span::styled(hints, dim_style)))
            .alignment(Alignment::Right);
        frame.render_widget(hints, chunks[1]);
        return;
    }
    frame.render_widget(Paragraph::new(status_line(app)), area);
}

fn status_line(app: &App) -> Line<'_> {
    let (label, style) = match app.focus {
        Focus::Terminal => (
            "-- TERMINAL --",
            Style::default().fg(Color::DarkGray),
        ),
        Focus::Chat => (
            "-- ASSISTANT --",
            Style::default().bg(Color::Magenta).fg(Color::Black),
        ),
    };
    let mut spans = vec![Span::styled(label, style)];
    if let Some(message) = &app.status {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(message.as_str(), Style::default().fg(Color::Yellow)));
    }
    Line::from(spans)
}

fn keymap_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "unbound".to_string()
    } else {
        trimmed.to_string()
    }
}
