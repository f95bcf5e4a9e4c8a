//! Application orchestration and main event loop.
//!
//! This module owns the application lifecycle:
//! - Initialization (config, logging, shell spawn, conversation stack)
//! - Event loop (keys, PTY output, quiescence timers, turn events)
//! - UI rendering delegation
//!
//! The app is structured around a single `App` struct that holds all
//! UI-side state. Events are processed sequentially in the main loop.
//!
//! Submodules:
//! - state: App struct and pane focus
//! - runner: main loop and terminal setup
//! - input: key and event handling
//! - render: UI rendering methods

mod input;
mod render;
mod runner;
mod state;

pub use runner::run;
