//! Viewport truncation for terminal frames and entry logs.
//!
//! Both panes prefer the most recent content: when there is more than fits,
//! the oldest lines (or entries) are hidden and the count is reported so the
//! renderer can say how much is out of view.

/// Rows reserved around the terminal text (pane borders and status line).
pub const TERMINAL_UI_OVERHEAD: u16 = 3;

/// Length of the `[HH:MM:SS] ` prefix drawn before each entry.
const ENTRY_PREFIX_WIDTH: usize = 11;

/// Lines that remain visible for a pane of `rows` total rows.
pub fn visible_rows(rows: u16) -> usize {
    rows.saturating_sub(TERMINAL_UI_OVERHEAD) as usize
}

/// Result of bounding text to a line budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    pub text: String,
    pub hidden_count: usize,
}

/// Keep the last `visible` lines of `text`.
pub fn truncate_lines(text: &str, visible: usize) -> Viewport {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= visible {
        return Viewport {
            text: text.to_string(),
            hidden_count: 0,
        };
    }
    let hidden_count = lines.len() - visible;
    Viewport {
        text: lines[hidden_count..].join("\n"),
        hidden_count,
    }
}

/// Estimated wrapped height of an entry drawn at `width` columns.
pub fn estimate_entry_height(text: &str, width: usize) -> usize {
    let width = width.max(1);
    let len = ENTRY_PREFIX_WIDTH + text.chars().count();
    len.div_ceil(width).max(1)
}

/// Entries that fit into `height` rows, newest last.
///
/// Walks backwards from the newest entry; returns the index of the first
/// visible entry, which is also the number of hidden entries. The newest
/// entry is always shown even when it alone overflows.
pub fn fit_entries<'a, I>(texts: I, height: usize, width: usize) -> usize
where
    I: DoubleEndedIterator<Item = &'a str> + ExactSizeIterator,
{
    let total = texts.len();
    let mut used = 0usize;
    let mut shown = 0usize;
    for text in texts.rev() {
        let needed = estimate_entry_height(text, width);
        if shown > 0 && used + needed > height {
            break;
        }
        used += needed;
        shown += 1;
    }
    total - shown
}
