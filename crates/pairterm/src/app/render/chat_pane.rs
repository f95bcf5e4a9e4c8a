use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::chat::{Turn, TurnKind};
use crate::terminal::viewport::fit_entries;

use super::super::state::{App, Focus, PROMPT_HEIGHT};
use super::layout::pane_block;

const THINKING_TEXT: &str = "Thinking...";

/// Render conversation entries above the prompt box.
pub(super) fn render_chat_pane(app: &App, frame: &mut ratatui::Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(PROMPT_HEIGHT)])
        .split(area);

    let focused = app.focus == Focus::Chat;
    let block = pane_block("Assistant", focused);
    let inner = block.inner(chunks[0]);
    frame.render_widget(block, chunks[0]);
    render_entries(app, frame, inner);
    render_prompt(app, frame, chunks[1]);
}

fn render_entries(app: &App, frame: &mut ratatui::Frame, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let turns = app.conversation.turns();
    if turns.is_empty() {
        frame.render_widget(Paragraph::new(welcome_lines()), area);
        return;
    }

    let texts: Vec<String> = turns.iter().map(entry_text).collect();
    let width = area.width as usize;
    let height = area.height as usize;
    let mut hidden = fit_entries(texts.iter().map(String::as_str), height, width);
    if hidden > 0 && height > 1 {
        hidden = fit_entries(texts.iter().map(String::as_str), height - 1, width);
    }

    let mut lines = Vec::new();
    if hidden > 0 {
        lines.push(Line::styled(
            format!("⋮ ({hidden} more entries above)"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    for turn in &turns[hidden..] {
        lines.extend(entry_lines(turn));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

fn render_prompt(app: &App, frame: &mut ratatui::Frame, area: Rect) {
    let focused = app.focus == Focus::Chat;
    let approval = app.conversation.pending_approval().is_some();
    let title = if approval { "Approve? Enter=Yes, Esc=No" } else { "Message" };
    let block = pane_block(title, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = if approval {
        Line::styled(
            "Waiting for your decision",
            Style::default().fg(Color::Yellow),
        )
    } else if app.prompt_input.is_empty() && !focused {
        Line::styled(
            "Ask the assistant, or /command to run in the shell",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Line::raw(app.prompt_input.as_str())
    };

    // Keep the end of long input visible.
    let len = app.prompt_input.chars().count() as u16;
    let scroll = len.saturating_sub(inner.width.saturating_sub(1));
    frame.render_widget(Paragraph::new(line).scroll((0, scroll)), inner);

    if focused && !approval && inner.width > 0 && inner.height > 0 {
        let x = inner.x + len.saturating_sub(scroll);
        frame.set_cursor_position(Position::new(x, inner.y));
    }
}

/// Text used for the wrapped-height estimate.
fn entry_text(turn: &Turn) -> String {
    let (label, _) = label(turn.kind);
    if turn.kind == TurnKind::Thinking {
        return format!("{label}{THINKING_TEXT}");
    }
    format!("{label}{}", turn.text)
}

fn label(kind: TurnKind) -> (&'static str, Style) {
    match kind {
        TurnKind::User => ("You: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        TurnKind::Command => ("$ ", Style::default().fg(Color::Yellow)),
        TurnKind::Assistant => ("Assistant: ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        TurnKind::Thinking => ("", Style::default()),
        TurnKind::ToolCall => ("⏺ ", Style::default().fg(Color::Magenta)),
        TurnKind::ToolResult => ("  ⎿ ", Style::default().fg(Color::Red)),
        TurnKind::ApprovalPending => ("? ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        TurnKind::ApprovalGranted => ("✓ ", Style::default().fg(Color::Green)),
        TurnKind::ApprovalDenied => ("✗ ", Style::default().fg(Color::Red)),
    }
}

fn body_style(turn: &Turn) -> Style {
    match turn.kind {
        TurnKind::Thinking => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        TurnKind::Assistant if turn.text.starts_with("Error:") => Style::default().fg(Color::Red),
        TurnKind::ToolResult | TurnKind::ApprovalDenied => Style::default().fg(Color::Red),
        TurnKind::ApprovalPending => Style::default().fg(Color::Yellow),
        TurnKind::ToolCall => Style::default().fg(Color::Gray),
        _ => Style::default(),
    }
}

fn entry_lines(turn: &Turn) -> Vec<Line<'static>> {
    let (label, label_style) = label(turn.kind);
    let style = body_style(turn);
    let text = if turn.kind == TurnKind::Thinking {
        THINKING_TEXT.to_string()
    } else {
        turn.text.clone()
    };
    let stamp = Span::styled(
        turn.timestamp.format("[%H:%M:%S] ").to_string(),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
    );

    let mut lines = Vec::new();
    for (index, raw) in text.split('\n').enumerate() {
        if index == 0 {
            lines.push(Line::from(vec![
                stamp.clone(),
                Span::styled(label, label_style),
                Span::styled(raw.to_string(), style),
            ]));
        } else {
            lines.push(Line::from(Span::styled(raw.to_string(), style)));
        }
    }
    lines
}

fn welcome_lines() -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    vec![
        Line::styled("Ask about your terminal or have the assistant run commands.", dim),
        Line::styled("Commands that change things need your approval.", dim),
        Line::raw(""),
        Line::styled("/<command>  run a command in the shell", dim),
        Line::styled("/clear      forget the conversation", dim),
    ]
}
