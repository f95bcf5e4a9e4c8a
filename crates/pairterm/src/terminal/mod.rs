//! Terminal session management for the embedded shell.
//!
//! This module owns all terminal-related concerns:
//! - PTY spawning and lifecycle (pty.rs)
//! - emulator state and frame serialization (screen.rs)
//! - flattening serialized frames for display (sanitize.rs)
//! - bounding frames to the visible rows (viewport.rs)
//! - converting frames to ratatui text (render.rs)
//! - key encoding for the shell (input.rs)
//! - running agent commands through the shell (runner.rs)

mod input;
mod pty;
mod render;
mod runner;
mod screen;

pub mod sanitize;
pub mod viewport;

pub use input::key_event_to_bytes;
pub use pty::{PtySession, SessionState, ShellSpec};
pub use render::{frame_text, hidden_lines_marker};
pub use runner::PtyCommandRunner;
