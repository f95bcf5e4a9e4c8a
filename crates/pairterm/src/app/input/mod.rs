//! Input event handling.
//!
//! Routes app events to handlers: app-level chords first, then keys go to
//! whichever pane has focus. Shell-side effects (PTY output, command
//! tracking, agent commands) live in terminal.rs; the prompt and approval
//! keys live in prompt.rs.

mod event;
mod prompt;
mod terminal;

pub use event::handle_event;
