use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::state::App;

use super::terminal::write_to_shell;

const CLEAR_COMMAND: &str = "/clear";

pub(super) fn handle_prompt_key(app: &mut App, key: KeyEvent) {
    if approval_blocking(app) {
        match key.code {
            KeyCode::Enter => app.orchestrator.gate().approve(),
            KeyCode::Esc => app.orchestrator.gate().reject(),
            _ => {}
        }
        return;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => submit_prompt(app),
        KeyCode::Backspace => {
            app.prompt_input.pop();
        }
        KeyCode::Esc => app.prompt_input.clear(),
        KeyCode::Char('u') if ctrl => app.prompt_input.clear(),
        KeyCode::Char(ch) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            app.prompt_input.push(ch);
        }
        _ => {}
    }
}

/// While an approval is outstanding the prompt only answers it.
fn approval_blocking(app: &App) -> bool {
    app.orchestrator.gate().is_pending() || app.conversation.pending_approval().is_some()
}

fn submit_prompt(app: &mut App) {
    let text = app.prompt_input.trim().to_string();
    if text.is_empty() {
        return;
    }

    if text == CLEAR_COMMAND {
        app.conversation.clear();
        app.orchestrator.clear();
        app.prompt_input.clear();
        app.set_status("Conversation cleared");
        return;
    }

    if let Some(command) = text.strip_prefix('/') {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        app.conversation.add_command(&text);
        let mut bytes = command.as_bytes().to_vec();
        bytes.push(b'\r');
        write_to_shell(app, &bytes);
        app.prompt_input.clear();
        return;
    }

    let sink = app.event_tx.clone();
    if app.orchestrator.send_message(&text, sink) {
        app.prompt_input.clear();
    } else {
        app.set_status("Still answering the previous message");
    }
}
