//! Keystroke encoding for the shell PTY.
//!
//! Crossterm key events become the byte sequences a shell expects:
//! printable characters as UTF-8, Ctrl+letter as C0 control codes, Alt as an
//! ESC prefix, and navigation keys as CSI sequences carrying an xterm
//! modifier parameter when any modifier is held.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

/// Encode a key event for the PTY. `None` for keys the shell never sees.
pub fn key_event_to_bytes(key: KeyEvent) -> Option<Vec<u8>> {
    let mods = key.modifiers;
    let bytes = match key.code {
        KeyCode::Char(ch) => return Some(encode_char(ch, mods)),
        KeyCode::Enter => match modifier_param(mods) {
            Some(param) => format!("\x1b[13;{param}u").into_bytes(),
            None => vec![b'\r'],
        },
        KeyCode::Tab if mods.contains(KeyModifiers::SHIFT) => shift_tab(mods),
        KeyCode::Tab => alt_prefixed(mods, vec![b'\t']),
        KeyCode::BackTab => shift_tab(mods),
        KeyCode::Backspace => alt_prefixed(mods, vec![DEL]),
        KeyCode::Esc => alt_prefixed(mods, vec![ESC]),
        KeyCode::Up => csi_letter(mods, 'A'),
        KeyCode::Down => csi_letter(mods, 'B'),
        KeyCode::Right => csi_letter(mods, 'C'),
        KeyCode::Left => csi_letter(mods, 'D'),
        KeyCode::Home => csi_letter(mods, 'H'),
        KeyCode::End => csi_letter(mods, 'F'),
        KeyCode::Delete => csi_tilde(mods, 3),
        KeyCode::PageUp => csi_tilde(mods, 5),
        KeyCode::PageDown => csi_tilde(mods, 6),
        _ => return None,
    };
    Some(bytes)
}

fn encode_char(ch: char, mods: KeyModifiers) -> Vec<u8> {
    let lower = ch.to_ascii_lowercase();
    let base = if mods.contains(KeyModifiers::CONTROL) && lower.is_ascii_lowercase() {
        vec![lower as u8 - b'a' + 1]
    } else {
        let mut buffer = [0u8; 4];
        ch.encode_utf8(&mut buffer).as_bytes().to_vec()
    };
    alt_prefixed(mods, base)
}

fn alt_prefixed(mods: KeyModifiers, bytes: Vec<u8>) -> Vec<u8> {
    if mods.contains(KeyModifiers::ALT) {
        let mut prefixed = Vec::with_capacity(bytes.len() + 1);
        prefixed.push(ESC);
        prefixed.extend(bytes);
        prefixed
    } else {
        bytes
    }
}

// xterm modifier parameter: 1 + shift(1) + alt(2) + ctrl(4).
fn modifier_param(mods: KeyModifiers) -> Option<u8> {
    let mut value = 1;
    if mods.contains(KeyModifiers::SHIFT) {
        value += 1;
    }
    if mods.contains(KeyModifiers::ALT) {
        value += 2;
    }
    if mods.contains(KeyModifiers::CONTROL) {
        value += 4;
    }
    (value > 1).then_some(value)
}

fn csi_letter(mods: KeyModifiers, letter: char) -> Vec<u8> {
    match modifier_param(mods) {
        Some(param) => format!("\x1b[1;{param}{letter}").into_bytes(),
        None => format!("\x1b[{letter}").into_bytes(),
    }
}

fn csi_tilde(mods: KeyModifiers, code: u8) -> Vec<u8> {
    match modifier_param(mods) {
        Some(param) => format!("\x1b[{code};{param}~").into_bytes(),
        None => format!("\x1b[{code}~").into_bytes(),
    }
}

fn shift_tab(mods: KeyModifiers) -> Vec<u8> {
    // BackTab already implies shift; only extra modifiers change the encoding.
    match modifier_param(mods - KeyModifiers::SHIFT) {
        Some(param) => format!("\x1b[1;{}Z", param + 1).into_bytes(),
        None => b"\x1b[Z".to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::key_event_to_bytes;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn encode(code: KeyCode, mods: KeyModifiers) -> Vec<u8> {
        key_event_to_bytes(KeyEvent::new(code, mods)).unwrap_or_default()
    }

    #[test]
    fn basic_keys_use_shell_encodings() {
        assert_eq!(encode(KeyCode::Up, KeyModifiers::NONE), b"\x1b[A");
        assert_eq!(encode(KeyCode::Down, KeyModifiers::NONE), b"\x1b[B");
        assert_eq!(encode(KeyCode::Right, KeyModifiers::NONE), b"\x1b[C");
        assert_eq!(encode(KeyCode::Left, KeyModifiers::NONE), b"\x1b[D");
        assert_eq!(encode(KeyCode::Enter, KeyModifiers::NONE), b"\r");
        assert_eq!(encode(KeyCode::Backspace, KeyModifiers::NONE), b"\x7f");
        assert_eq!(encode(KeyCode::Tab, KeyModifiers::NONE), b"\t");
    }

    #[test]
    fn control_letters_become_c0_codes() {
        assert_eq!(encode(KeyCode::Char('c'), KeyModifiers::CONTROL), vec![3]);
        assert_eq!(encode(KeyCode::Char('D'), KeyModifiers::CONTROL), vec![4]);
    }

    #[test]
    fn alt_prefixes_escape() {
        assert_eq!(encode(KeyCode::Char('b'), KeyModifiers::ALT), b"\x1bb");
    }

    #[test]
    fn modified_arrows_carry_parameter() {
        assert_eq!(encode(KeyCode::Left, KeyModifiers::CONTROL), b"\x1b[1;5D");
        assert_eq!(encode(KeyCode::Delete, KeyModifiers::SHIFT), b"\x1b[3;2~");
    }

    #[test]
    fn back_tab_encodes_once() {
        assert_eq!(encode(KeyCode::BackTab, KeyModifiers::SHIFT), b"\x1b[Z");
        assert_eq!(encode(KeyCode::BackTab, KeyModifiers::NONE), b"\x1b[Z");
    }

    #[test]
    fn unicode_characters_pass_through() {
        assert_eq!(encode(KeyCode::Char('é'), KeyModifiers::NONE), "é".as_bytes());
    }

    #[test]
    fn function_keys_are_ignored() {
        assert!(key_event_to_bytes(KeyEvent::new(KeyCode::F(5), KeyModifiers::NONE)).is_none());
    }
}
