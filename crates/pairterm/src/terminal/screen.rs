//! Terminal state machine: emulator model plus frame serialization.
//!
//! PTY chunks are fed in arrival order into a vt100 parser. A frame is the
//! screen serialized one row per line, sanitized and then bounded to the
//! visible rows. Frames are produced on demand so the event loop can
//! coalesce many chunks into one render.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;
use vt100::Parser;

use super::sanitize::{plain_text, sanitize};
use super::viewport::truncate_lines;

const SCROLLBACK_LINES: usize = 1000;

// A soft-wrapped row opens with an absolute move to its first cell.
static ROW_START_MOVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\x1b\[\d+;(\d+)H").expect("valid row start pattern")
});

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("screen serialization is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Immutable snapshot of the terminal pane for one render cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub text: String,
    pub hidden_lines: usize,
    pub rows: u16,
    pub cols: u16,
    pub seq: u64,
}

pub struct TerminalStateMachine {
    parser: Parser,
    seq: u64,
}

impl TerminalStateMachine {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            parser: Parser::new(rows.max(1), cols.max(1), SCROLLBACK_LINES),
            seq: 0,
        }
    }

    /// Feed one PTY chunk.
    pub fn feed(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.parser.process(bytes);
        self.seq += 1;
    }

    pub fn resize(&mut self, rows: u16, cols: u16) {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if self.size() == (rows, cols) {
            return;
        }
        self.parser.set_size(rows, cols);
        self.seq += 1;
    }

    /// Emulator geometry as `(rows, cols)`.
    pub fn size(&self) -> (u16, u16) {
        self.parser.screen().size()
    }

    /// Cursor as `(row, col)`, unless the program hid it.
    pub fn cursor(&self) -> Option<(u16, u16)> {
        let screen = self.parser.screen();
        (!screen.hide_cursor()).then(|| screen.cursor_position())
    }

    /// Number of updates applied so far. Changes whenever a new frame would.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Serialize the current screen and bound it to `visible` lines.
    pub fn frame(&self, visible: usize) -> Result<Frame, FrameError> {
        let (rows, cols) = self.size();
        let mut lines = Vec::with_capacity(usize::from(rows));
        for row in self.parser.screen().rows_formatted(0, cols) {
            let row = String::from_utf8(row)?;
            lines.push(sanitize(&expand_row_start(&row)));
        }
        let view = truncate_lines(&trim_trailing_blank_lines(&lines.join("\n")), visible);
        Ok(Frame {
            text: view.text,
            hidden_lines: view.hidden_count,
            rows,
            cols,
            seq: self.seq,
        })
    }
}

fn expand_row_start(row: &str) -> Cow<'_, str> {
    ROW_START_MOVE.replace(row, |caps: &Captures<'_>| {
        let col = caps[1].parse::<usize>().unwrap_or(1);
        " ".repeat(col.saturating_sub(1))
    })
}

// Rows below the cursor serialize as blank lines; they are not content.
fn trim_trailing_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = text.split('\n').collect();
    while lines.len() > 1
        && lines
            .last()
            .is_some_and(|line| plain_text(line).trim().is_empty())
    {
        lines.pop();
    }
    let mut trimmed = lines.join("\n");
    let end = trimmed.trim_end_matches(' ').len();
    trimmed.truncate(end);
    trimmed
}

#[cfg(test)]
mod tests {
    use super::{expand_row_start, TerminalStateMachine};
    use crate::terminal::sanitize::plain_text;
    use pretty_assertions::assert_eq;

    fn visible(text: &str) -> String {
        plain_text(text).into_owned()
    }

    #[test]
    fn frame_contains_printed_text() {
        let mut screen = TerminalStateMachine::new(5, 20);
        screen.feed(b"hello\r\nworld");
        let frame = screen.frame(5).expect("frame");
        assert_eq!(visible(&frame.text), "hello\nworld");
        assert_eq!(frame.hidden_lines, 0);
        assert_eq!((frame.rows, frame.cols), (5, 20));
    }

    #[test]
    fn chunks_apply_in_order() {
        let mut screen = TerminalStateMachine::new(3, 20);
        for chunk in ["ab", "c\r\n", "de"] {
            screen.feed(chunk.as_bytes());
        }
        assert_eq!(visible(&screen.frame(3).expect("frame").text), "abc\nde");
        assert_eq!(screen.seq(), 3);
    }

    #[test]
    fn frame_keeps_most_recent_lines() {
        let mut screen = TerminalStateMachine::new(6, 20);
        screen.feed(b"1\r\n2\r\n3\r\n4\r\n5");
        let frame = screen.frame(2).expect("frame");
        assert_eq!(visible(&frame.text), "4\n5");
        assert_eq!(frame.hidden_lines, 3);
    }

    #[test]
    fn colors_survive_serialization() {
        let mut screen = TerminalStateMachine::new(2, 20);
        screen.feed(b"\x1b[31mred\x1b[0m");
        let frame = screen.frame(2).expect("frame");
        assert!(frame.text.contains("31m"));
        assert_eq!(visible(&frame.text), "red");
    }

    #[test]
    fn blank_rows_stay_separate_lines() {
        let mut screen = TerminalStateMachine::new(6, 20);
        screen.feed(b"a\r\n\r\n\r\nb");
        let frame = screen.frame(6).expect("frame");
        assert_eq!(visible(&frame.text), "a\n\n\nb");
        assert_eq!(frame.hidden_lines, 0);
    }

    #[test]
    fn absolute_positioning_lands_on_its_row() {
        let mut screen = TerminalStateMachine::new(6, 20);
        screen.feed(b"top\x1b[4;1Hbottom");
        assert_eq!(visible(&screen.frame(6).expect("frame").text), "top\n\n\nbottom");

        screen.feed(b"\x1b[2;5Hmid");
        assert_eq!(
            visible(&screen.frame(6).expect("frame").text),
            "top\n    mid\n\nbottom"
        );
    }

    #[test]
    fn full_screen_redraw_keeps_row_structure() {
        let mut screen = TerminalStateMachine::new(4, 10);
        screen.feed(b"\x1b[?1049h\x1b[H\x1b[2J\x1b[1;1Htitle\x1b[3;3Hbody\x1b[4;1H~");
        let frame = screen.frame(4).expect("frame");
        assert_eq!(visible(&frame.text), "title\n\n  body\n~");
        assert_eq!(screen.cursor(), Some((3, 1)));
    }

    #[test]
    fn wrapped_row_start_becomes_spaces() {
        assert_eq!(expand_row_start("\x1b[2;3Hx"), "  x");
        assert_eq!(expand_row_start("\x1b[7;1Hx"), "x");
        assert_eq!(expand_row_start("a\x1b[2;3Hx"), "a\x1b[2;3Hx");
    }

    #[test]
    fn resize_updates_geometry() {
        let mut screen = TerminalStateMachine::new(24, 80);
        screen.resize(10, 40);
        assert_eq!(screen.size(), (10, 40));
        screen.resize(0, 0);
        assert_eq!(screen.size(), (1, 1));
    }
}
