use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

/// Lines moved by one Shift+PageUp/PageDown.
const SCROLL_STEP: usize = 10;

/// Handle a key event. `Ctrl+Q` and scrollback keys stay local; everything
/// else goes to the remote shell.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),
        KeyCode::PageUp if key.modifiers.contains(KeyModifiers::SHIFT) => {
            app.scroll_up(SCROLL_STEP)
        }
        KeyCode::PageDown if key.modifiers.contains(KeyModifiers::SHIFT) => {
            app.scroll_down(SCROLL_STEP)
        }
        _ => {
            if let Some(data) = encode_key(&key) {
                app.send_input(&data);
            }
        }
    }
}

/// xterm byte encoding of a key press.
pub fn encode_key(key: &KeyEvent) -> Option<String> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let data = match key.code {
        KeyCode::Char(c) if ctrl => {
            let lower = c.to_ascii_lowercase();
            match lower {
                'a'..='z' => ((lower as u8 - b'a' + 1) as char).to_string(),
                '@' | ' ' => "\0".to_string(),
                '[' => "\x1b".to_string(),
                '\\' => "\x1c".to_string(),
                ']' => "\x1d".to_string(),
                _ => return None,
            }
        }
        KeyCode::Char(c) if alt => format!("\x1b{c}"),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "\r".to_string(),
        KeyCode::Backspace => "\x7f".to_string(),
        KeyCode::Tab => "\t".to_string(),
        KeyCode::BackTab => "\x1b[Z".to_string(),
        KeyCode::Esc => "\x1b".to_string(),
        KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down => {
            let letter = match key.code {
                KeyCode::Up => 'A',
                KeyCode::Down => 'B',
                KeyCode::Right => 'C',
                _ => 'D',
            };
            if ctrl {
                format!("\x1b[1;5{letter}")
            } else if alt {
                format!("\x1b[1;3{letter}")
            } else {
                format!("\x1b[{letter}")
            }
        }
        KeyCode::Home => "\x1b[H".to_string(),
        KeyCode::End => "\x1b[F".to_string(),
        KeyCode::Insert => "\x1b[2~".to_string(),
        KeyCode::Delete => "\x1b[3~".to_string(),
        KeyCode::PageUp => "\x1b[5~".to_string(),
        KeyCode::PageDown => "\x1b[6~".to_string(),
        KeyCode::F(n) => match n {
            1 => "\x1bOP".to_string(),
            2 => "\x1bOQ".to_string(),
            3 => "\x1bOR".to_string(),
            4 => "\x1bOS".to_string(),
            5 => "\x1b[15~".to_string(),
            6 => "\x1b[17~".to_string(),
            7 => "\x1b[18~".to_string(),
            8 => "\x1b[19~".to_string(),
            9 => "\x1b[20~".to_string(),
            10 => "\x1b[21~".to_string(),
            11 => "\x1b[23~".to_string(),
            12 => "\x1b[24~".to_string(),
            _ => return None,
        },
        _ => return None,
    };
    Some(data)
}
