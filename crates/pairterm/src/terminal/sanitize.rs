//! Output sanitizer for serialized terminal frames.
//!
//! The pane renderer understands plain text plus SGR styling and nothing
//! else, so emulator output is flattened before display:
//! - backspaces erase the preceding character of the combined buffer
//! - carriage returns are dropped (CRLF and CR-CR-LF collapse to `\n`)
//! - cursor-forward (`ESC[<n>C`) becomes `n` literal spaces
//! - cursor movement, clears, and mode switches are removed
//!
//! SGR sequences (`ESC[...m`) pass through untouched.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Upper bound for a single cursor-forward expansion.
const MAX_CURSOR_FORWARD: usize = 4096;

static CURSOR_FORWARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[([0-9]*)C").expect("valid cursor-forward pattern"));

// Cursor addressing, erase, scroll region, insert/delete and mode set/reset.
static CSI_UNSUPPORTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[?>=]?[0-9;]*[ABDEFGHJKLMPSTX@dfhlnrsu]")
        .expect("valid csi pattern")
});

// Window titles and other operating system commands.
static OSC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)").expect("valid osc pattern")
});

// Charset designation, keypad modes, DEC save/restore, reverse index.
static SHORT_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b(?:[()][0-9A-Za-z]|[78=>M])").expect("valid short escape pattern")
});

static SGR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;:]*m").expect("valid sgr pattern"));

/// Sanitize a full buffer.
pub fn sanitize(input: &str) -> String {
    let erased = resolve_backspaces(input);
    let flattened = strip_carriage_returns(&erased);
    rewrite_escapes(flattened)
}

/// Sanitize `chunk` as a continuation of `previous`.
///
/// Backspaces at the start of `chunk` erase characters from `previous`, and
/// escape sequences split across the boundary are recognised.
pub fn sanitize_append(previous: &str, chunk: &str) -> String {
    let mut combined = String::with_capacity(previous.len() + chunk.len());
    combined.push_str(previous);
    combined.push_str(chunk);
    sanitize(&combined)
}

/// Drop SGR styling, leaving the text a reader would see.
pub fn plain_text(input: &str) -> Cow<'_, str> {
    SGR.replace_all(input, "")
}

fn resolve_backspaces(input: &str) -> String {
    if !input.contains('\u{8}') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '\u{8}' {
            // Dropped at buffer start.
            out.pop();
        } else {
            out.push(ch);
        }
    }
    out
}

fn strip_carriage_returns(input: &str) -> String {
    if input.contains('\r') {
        input.replace('\r', "")
    } else {
        input.to_string()
    }
}

// Removing one sequence can splice the bytes around it into another, so
// passes repeat until nothing changes. Every pass that changes the text
// removes at least one ESC.
fn rewrite_escapes(mut text: String) -> String {
    while text.contains('\u{1b}') {
        let next = rewrite_escapes_once(&text);
        if next == text {
            break;
        }
        text = next;
    }
    text
}

fn rewrite_escapes_once(text: &str) -> String {
    let spaced = CURSOR_FORWARD.replace_all(text, |caps: &Captures<'_>| {
        let digits = &caps[1];
        let count = if digits.is_empty() {
            1
        } else {
            // Only overflow can fail here.
            digits
                .parse::<usize>()
                .map_or(MAX_CURSOR_FORWARD, |count| count.min(MAX_CURSOR_FORWARD))
        };
        " ".repeat(count)
    });
    let stripped = CSI_UNSUPPORTED.replace_all(&spaced, "");
    let stripped = OSC.replace_all(&stripped, "");
    SHORT_ESCAPE.replace_all(&stripped, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::{plain_text, sanitize, sanitize_append, MAX_CURSOR_FORWARD};
    use pretty_assertions::assert_eq;

    const SAMPLES: &[&str] = &[
        "",
        "plain text",
        "\u{1b}[?25l\u{1b}[H\u{1b}[Juser@host:~$ \u{1b}[5Cls\r\n",
        "a\u{8}\u{8}b",
        "\u{1b}[31mred\u{1b}[0m\r\r\nnext",
        "\u{1b}]0;title\u{7}prompt$ ",
        "\u{1b}[\u{1b}[H5C",
        "progress 10%\rprogress 20%\r\n",
        "\u{1b}[5\u{8}C",
        "\u{1b}(B\u{1b}[m\u{1b}[?2004hzsh% ",
        "tab\tstop \u{1b}[3Cend\u{8}\u{8}",
    ];

    #[test]
    fn cursor_forward_becomes_spaces() {
        assert_eq!(sanitize("a\u{1b}[15Cb"), format!("a{}b", " ".repeat(15)));
        assert_eq!(sanitize("a\u{1b}[Cb"), "a b");
        assert_eq!(sanitize("\u{1b}[0C"), "");
    }

    #[test]
    fn oversized_cursor_forward_is_capped() {
        let out = sanitize("a\u{1b}[99999999999999999999999Cb");
        assert_eq!(out, format!("a{}b", " ".repeat(MAX_CURSOR_FORWARD)));
        assert_eq!(sanitize("\u{1b}[5000C").len(), MAX_CURSOR_FORWARD);
    }

    #[test]
    fn deeply_nested_sequences_are_fully_removed() {
        let mut nested = String::new();
        for _ in 0..20 {
            nested = format!("\u{1b}[{nested}H");
        }
        assert_eq!(sanitize(&format!("{nested}x")), "x");
    }

    #[test]
    fn cursor_forward_leaves_no_remnant() {
        for n in [1usize, 2, 7, 40, 120] {
            let out = sanitize(&format!("[\u{1b}[{n}C]"));
            assert_eq!(out, format!("[{}]", " ".repeat(n)));
            assert!(!out.contains('\u{1b}'));
        }
    }

    #[test]
    fn removes_cursor_clear_and_mode_sequences() {
        let input = "\u{1b}[?1049h\u{1b}[H\u{1b}[2J\u{1b}[?25lhello\u{1b}[3;4H\u{1b}[K\u{1b}[?25h";
        assert_eq!(sanitize(input), "hello");
    }

    #[test]
    fn keeps_sgr_sequences() {
        let input = "\u{1b}[1;32mok\u{1b}[0m \u{1b}[38;5;208mwarn\u{1b}[m";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn plain_text_drops_styling_only() {
        assert_eq!(plain_text("\u{1b}[1;32mok\u{1b}[0m done\u{1b}[m"), "ok done");
    }

    #[test]
    fn collapses_line_ending_variants() {
        assert_eq!(sanitize("a\r\nb\r\r\nc\rd"), "a\nb\ncd");
    }

    #[test]
    fn backspace_erases_previous_character() {
        assert_eq!(sanitize("lss\u{8}"), "ls");
        assert_eq!(sanitize("ab\u{8} \u{8}"), "a");
    }

    #[test]
    fn backspace_at_buffer_start_is_dropped() {
        assert_eq!(sanitize("\u{8}\u{8}x"), "x");
    }

    #[test]
    fn backspace_reaches_into_previous_output() {
        assert_eq!(sanitize_append("$ lss", "\u{8}\u{1b}[K"), "$ ls");
    }

    #[test]
    fn split_escape_sequence_is_recognised_across_chunks() {
        assert_eq!(sanitize_append("a\u{1b}[1", "2Cb"), format!("a{}b", " ".repeat(12)));
    }

    #[test]
    fn strips_titles_and_charset_designations() {
        assert_eq!(sanitize("\u{1b}]0;vim\u{7}\u{1b}(Bx"), "x");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for sample in SAMPLES {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn erased_character_is_equivalent_to_absent_character() {
        let prefixes = ["", "abc", "\u{1b}[2C", "x\r\n", "\u{1b}[3"];
        let suffixes = ["", "def", "\u{8}", "\u{1b}[4C!", "C"];
        for prefix in prefixes {
            for suffix in suffixes {
                for erased in ['X', '\r', '\u{1b}', ' '] {
                    let with = format!("{prefix}{erased}\u{8}{suffix}");
                    let without = format!("{prefix}{suffix}");
                    assert_eq!(sanitize(&with), sanitize(&without), "{with:?}");
                }
            }
        }
    }
}
