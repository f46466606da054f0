//! Keystroke bytes (xterm encoding) to edit operations and wire key names.

/// What a chunk of keyboard input means to the line editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable text: a typed character or a sanitized paste.
    Text(String),
    Backspace,
    Enter,
    Delete,
    Home,
    End,
    Up,
    Down,
    Left,
    Right,
    WordLeft,
    WordRight,
    /// Request to paste from the clipboard.
    Paste,
    Unknown,
}

pub fn classify(data: &str) -> KeyInput {
    match data {
        "\x7f" | "\x08" => KeyInput::Backspace,
        "\r" | "\n" | "\r\n" => KeyInput::Enter,
        "\x1b[3~" => KeyInput::Delete,
        "\x1b[H" | "\x1b[1~" | "\x1bOH" => KeyInput::Home,
        "\x1b[F" | "\x1b[4~" | "\x1bOF" => KeyInput::End,
        "\x1b[A" => KeyInput::Up,
        "\x1b[B" => KeyInput::Down,
        "\x1b[C" => KeyInput::Right,
        "\x1b[D" => KeyInput::Left,
        "\x1b[1;5D" | "\x1b[1;3D" | "\x1bb" => KeyInput::WordLeft,
        "\x1b[1;5C" | "\x1b[1;3C" | "\x1bf" => KeyInput::WordRight,
        "\x16" => KeyInput::Paste,
        text if !text.is_empty() && !text.chars().any(char::is_control) => {
            KeyInput::Text(text.to_string())
        }
        _ => KeyInput::Unknown,
    }
}

/// Canonical key names sent alongside raw-mode input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKey {
    Backspace,
    Enter,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Delete,
    Home,
    End,
    Unknown,
}

impl SpecialKey {
    pub fn from_data(data: &str) -> Self {
        match data {
            "\x08" | "\x7f" => Self::Backspace,
            "\r" | "\n" => Self::Enter,
            "\x1b[A" => Self::ArrowUp,
            "\x1b[B" => Self::ArrowDown,
            "\x1b[C" => Self::ArrowRight,
            "\x1b[D" => Self::ArrowLeft,
            "\x1b[3~" => Self::Delete,
            "\x1b[H" | "\x1b[1~" => Self::Home,
            "\x1b[F" | "\x1b[4~" => Self::End,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backspace => "Backspace",
            Self::Enter => "Enter",
            Self::ArrowUp => "ArrowUp",
            Self::ArrowDown => "ArrowDown",
            Self::ArrowLeft => "ArrowLeft",
            Self::ArrowRight => "ArrowRight",
            Self::Delete => "Delete",
            Self::Home => "Home",
            Self::End => "End",
            Self::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_editing_keys() {
        assert_eq!(classify("\x7f"), KeyInput::Backspace);
        assert_eq!(classify("\x08"), KeyInput::Backspace);
        assert_eq!(classify("\r\n"), KeyInput::Enter);
        assert_eq!(classify("\x1b[3~"), KeyInput::Delete);
        assert_eq!(classify("\x1b[1~"), KeyInput::Home);
        assert_eq!(classify("\x1b[4~"), KeyInput::End);
        assert_eq!(classify("\x1b[1;5D"), KeyInput::WordLeft);
        assert_eq!(classify("\x1bf"), KeyInput::WordRight);
        assert_eq!(classify("\x16"), KeyInput::Paste);
    }

    #[test]
    fn printable_text_and_unknowns() {
        assert_eq!(classify("a"), KeyInput::Text("a".into()));
        assert_eq!(classify("héllo wörld"), KeyInput::Text("héllo wörld".into()));
        assert_eq!(classify(""), KeyInput::Unknown);
        assert_eq!(classify("\x03"), KeyInput::Unknown);
        assert_eq!(classify("\x1b[15~"), KeyInput::Unknown);
    }

    #[test]
    fn special_key_names() {
        assert_eq!(SpecialKey::from_data("\x1b[A").as_str(), "ArrowUp");
        assert_eq!(SpecialKey::from_data("\x1b[D").as_str(), "ArrowLeft");
        assert_eq!(SpecialKey::from_data("\r").as_str(), "Enter");
        assert_eq!(SpecialKey::from_data("\x7f").as_str(), "Backspace");
        assert_eq!(SpecialKey::from_data("\x1b[F").as_str(), "End");
        assert_eq!(SpecialKey::from_data("q").as_str(), "Unknown");
        assert_eq!(SpecialKey::from_data(":wq").as_str(), "Unknown");
    }
}
