//! Wire frames exchanged with the playground backend.
//!
//! Every frame is a JSON object whose `type` field selects the variant; the
//! remaining fields sit next to it (no nested payload object).

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Frames received from the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Shell output, streamed in chunks and closed by a complete frame.
    Command(CommandMessage),
    /// Out-of-band contents of the container's main file.
    File(FileMessage),
    /// Backend notification with no client-side handling yet.
    Event(serde_json::Value),
    /// Directory listing produced by an `xoblas` shell command.
    Xoblas(XoblasMessage),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandMessage {
    pub host: String,
    pub user: String,
    pub cwd: String,
    pub output: String,
    pub raw_mode: bool,
    /// Absent on screen redraws sent while a full-screen program runs.
    #[serde(default)]
    pub is_complete: bool,
    /// Set on the frame that leaves an alternate-screen program. Redraw
    /// replies carry `""` here, which reads as `false`.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_exiting_raw: bool,
}

/// `true` only for a JSON `true`; any other value is `false`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(false))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileMessage {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct XoblasMessage {
    pub file_structure: Vec<TreeNode>,
}

/// One entry of a `tree -J` style listing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TreeNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Vec<TreeNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
    Link,
}

impl TreeNode {
    /// Number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self
            .contents
            .as_deref()
            .map(|children| children.iter().map(TreeNode::count).sum())
            .unwrap_or(0)
    }
}

/// Frames sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Command {
        command: String,
    },
    Input {
        #[serde(rename = "specialKey")]
        special_key: String,
        data: String,
    },
    Resize {
        cols: u16,
        rows: u16,
    },
    WriteFile {
        content: String,
    },
}

impl OutboundMessage {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Command { .. } => "command",
            OutboundMessage::Input { .. } => "input",
            OutboundMessage::Resize { .. } => "resize",
            OutboundMessage::WriteFile { .. } => "write_file",
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode a text frame. Anything that is not a well-formed, known frame is
/// logged and dropped.
pub fn decode(text: &str) -> Option<InboundMessage> {
    match serde_json::from_str::<InboundMessage>(text) {
        Ok(message) => Some(message),
        Err(err) => {
            debug!(error = %err, frame = %truncate(text, 120), "dropping inbound frame");
            None
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
