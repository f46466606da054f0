//! Shell prompt synthesis sized to the terminal width.

use crate::protocol::CommandMessage;
use crate::terminal::ansi::{self, BLUE, GREEN, RESET};

/// Who and where the remote shell is, as reported by the last complete
/// command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user: String,
    pub host: String,
    pub cwd: String,
}

impl SessionIdentity {
    #[cfg(test)]
    pub fn new(user: impl Into<String>, host: impl Into<String>, cwd: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            cwd: cwd.into(),
        }
    }

    /// Identity from a command frame; empty fields get placeholders.
    pub fn from_message(msg: &CommandMessage) -> Self {
        fn or(value: &str, fallback: &str) -> String {
            if value.is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        }
        Self {
            user: or(&msg.user, "user"),
            host: or(&msg.host, "host"),
            cwd: or(&msg.cwd, "~"),
        }
    }
}

/// A rendered prompt and the number of columns it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub visible_len: usize,
}

impl Prompt {
    fn new(text: String) -> Self {
        let visible_len = ansi::visible_len(&text);
        Self { text, visible_len }
    }

    pub fn minimal() -> Self {
        Self::new("$ ".to_string())
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self::minimal()
    }
}

/// Build the prompt for a terminal `cols` wide.
///
/// `[user@host cwd]$ ` when it fits, `user@host$ ` when only that fits,
/// `$ ` otherwise or when no identity is known yet.
pub fn create_prompt(cols: usize, session: Option<&SessionIdentity>) -> Prompt {
    let Some(id) = session else {
        return Prompt::minimal();
    };
    let (user, host, cwd) = (
        id.user.chars().count(),
        id.host.chars().count(),
        id.cwd.chars().count(),
    );

    if user + host + cwd + 5 < cols {
        return Prompt::new(format!(
            "[{GREEN}{}@{}{RESET} {BLUE}{}{RESET}]$ ",
            id.user, id.host, id.cwd
        ));
    }
    if user + host + 4 < cols {
        return Prompt::new(format!("{GREEN}{}@{}{RESET}$ ", id.user, id.host));
    }
    Prompt::minimal()
}
