use crossterm::event::{KeyEvent, KeyEventKind};

use crate::app::state::{App, Focus};
use crate::chat::TurnEvent;
use crate::events::AppEvent;
use crate::keymap::matches_chord;

use super::prompt::handle_prompt_key;
use super::terminal::{
    forward_key, handle_pty_exit, handle_quiescence, handle_resize, process_terminal_output,
    run_agent_command,
};

/// Main event dispatcher.
pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Input(key) => handle_key(app, key),
        AppEvent::Resize(rows, cols) => handle_resize(app, rows, cols),
        AppEvent::PtyOutput(id, bytes) => process_terminal_output(app, id, &bytes),
        AppEvent::PtyExit(id) => handle_pty_exit(app, id),
        AppEvent::QuiescenceElapsed(id, generation) => handle_quiescence(app, id, generation),
        AppEvent::Turn(event) => handle_turn_event(app, event),
        AppEvent::RunCommand {
            command,
            output_tx,
        } => run_agent_command(app, &command, output_tx),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    if app
        .quit_chord
        .as_ref()
        .is_some_and(|chord| matches_chord(key, chord))
    {
        app.should_quit = true;
        return;
    }
    if app
        .toggle_chord
        .as_ref()
        .is_some_and(|chord| matches_chord(key, chord))
    {
        app.focus = app.focus.toggled();
        return;
    }
    match app.focus {
        Focus::Terminal => forward_key(app, key),
        Focus::Chat => handle_prompt_key(app, key),
    }
}

fn handle_turn_event(app: &mut App, event: TurnEvent) {
    match &event {
        TurnEvent::ApprovalPending(_) => {
            // Approvals are answered from the prompt.
            app.focus = Focus::Chat;
            app.set_status("Approval needed: Enter to run, Esc to reject");
        }
        TurnEvent::ApprovalGranted | TurnEvent::ApprovalDenied => app.status = None,
        TurnEvent::Failed(message) => tracing::warn!(%message, "turn failed"),
        _ => {}
    }
    app.conversation.apply(event);
}

#[cfg(test)]
mod tests {
    use super::handle_event;
    use crate::app::state::{App, Focus, SHELL_SESSION_ID};
    use crate::chat::{TurnEvent, TurnKind};
    use crate::config::{
        Config, HistoryConfig, KeymapConfig, LoggingConfig, ModelConfig, TerminalConfig,
    };
    use crate::events::AppEvent;
    use crate::history::{self, TrackerState};
    use crate::logging::Logger;
    use crate::tools::{ToolArgs, ToolCall};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn test_config() -> Config {
        Config {
            terminal: TerminalConfig {
                shell: "cat".to_string(),
                args: Vec::new(),
            },
            model: ModelConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                model: "gpt-4.1".to_string(),
                timeout: Duration::from_secs(5),
                max_tool_rounds: 4,
                api_key: None,
            },
            history: HistoryConfig {
                capacity: 10,
                quiescence: Duration::from_millis(20),
            },
            keymap: KeymapConfig {
                toggle_focus: "shift+tab".to_string(),
                quit: "ctrl+q".to_string(),
            },
            logging: LoggingConfig {
                enabled: false,
                level: "info".to_string(),
                dir: PathBuf::from("."),
            },
            warnings: Vec::new(),
        }
    }

    fn test_app() -> (App, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let cwd = std::env::temp_dir();
        let app = App::new(test_config(), cwd, Logger::disabled(), tx, 24, 80).expect("app");
        (app, rx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Input(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            handle_event(app, key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn resize_reaches_the_shell() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, AppEvent::Resize(40, 120));
        assert_eq!(app.session.size(), (37, 70));
    }

    #[test]
    fn chords_toggle_focus_and_quit() {
        let (mut app, _rx) = test_app();
        assert_eq!(app.focus, Focus::Terminal);
        handle_event(
            &mut app,
            AppEvent::Input(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT)),
        );
        assert_eq!(app.focus, Focus::Chat);
        handle_event(
            &mut app,
            AppEvent::Input(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn terminal_keys_reach_the_tracker() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "ls");
        assert_eq!(app.tracker.pending_input(), "ls");
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.tracker.state(), TrackerState::CapturingOutput);
    }

    #[test]
    fn quiescence_records_the_command() {
        let (mut app, rx) = test_app();
        type_text(&mut app, "echo hi");
        handle_event(&mut app, key(KeyCode::Enter));

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining).expect("quiescence event") {
                event @ AppEvent::QuiescenceElapsed(..) => {
                    handle_event(&mut app, event);
                    break;
                }
                event @ AppEvent::PtyOutput(..) => handle_event(&mut app, event),
                _ => {}
            }
        }
        let history = history::lock(&app.history);
        let records = history.recent(5, 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].input, "echo hi");
    }

    #[test]
    fn slash_prompt_runs_in_shell() {
        let (mut app, _rx) = test_app();
        app.focus = Focus::Chat;
        type_text(&mut app, "/pwd");
        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.prompt_input.is_empty());
        let last = app.conversation.turns().last().expect("entry");
        assert_eq!(last.kind, TurnKind::Command);
        assert_eq!(last.text, "/pwd");
        assert_eq!(app.tracker.state(), TrackerState::CapturingOutput);
    }

    #[test]
    fn clear_resets_conversation() {
        let (mut app, _rx) = test_app();
        app.conversation.add_command("/ls");
        app.focus = Focus::Chat;
        type_text(&mut app, "/clear");
        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.conversation.turns().is_empty());
        assert_eq!(app.status.as_deref(), Some("Conversation cleared"));
    }

    #[test]
    fn pending_approval_only_accepts_enter_and_esc() {
        let (mut app, _rx) = test_app();
        let gate = app.orchestrator.gate().clone();
        let waiter = thread::spawn(move || {
            gate.request(&ToolCall {
                id: "call_1".to_string(),
                name: "execute_mutable_command".to_string(),
                args: ToolArgs::new(),
            })
        });
        handle_event(
            &mut app,
            AppEvent::Turn(TurnEvent::ApprovalPending(
                "Execute 'ls'? (look) [Enter=Yes, Esc=No]".to_string(),
            )),
        );
        assert_eq!(app.focus, Focus::Chat);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.orchestrator.gate().is_pending() {
            assert!(Instant::now() < deadline, "approval never pending");
            thread::sleep(Duration::from_millis(5));
        }
        type_text(&mut app, "x");
        assert!(app.prompt_input.is_empty());

        handle_event(&mut app, key(KeyCode::Esc));
        assert_eq!(
            waiter.join().expect("waiter"),
            Ok(crate::chat::Decision::Rejected)
        );
    }

    #[test]
    fn agent_command_streams_output_back() {
        let (mut app, _rx) = test_app();
        let (output_tx, output_rx) = mpsc::channel();
        handle_event(
            &mut app,
            AppEvent::RunCommand {
                command: "ls".to_string(),
                output_tx,
            },
        );
        assert_eq!(app.tracker.state(), TrackerState::CapturingOutput);
        handle_event(
            &mut app,
            AppEvent::PtyOutput(SHELL_SESSION_ID, b"a.txt\r\n".to_vec()),
        );
        assert_eq!(output_rx.try_recv().as_deref(), Ok("a.txt\r\n"));

        drop(output_rx);
        handle_event(&mut app, AppEvent::PtyOutput(SHELL_SESSION_ID, b"$ ".to_vec()));
        assert!(app.command_taps.is_empty());
    }

    #[test]
    fn shell_exit_quits() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, AppEvent::PtyExit(SHELL_SESSION_ID + 1));
        assert!(!app.should_quit);
        handle_event(&mut app, AppEvent::PtyExit(SHELL_SESSION_ID));
        assert!(app.should_quit);
    }
}
