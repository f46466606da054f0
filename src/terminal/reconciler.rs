//! Bookkeeping for inbound frames: when to redraw the prompt, whether the
//! remote program owns the keyboard, and when the environment is ready.

use tracing::{debug, info};

use crate::protocol::CommandMessage;

/// What to do with a `command` frame after its output has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPlan {
    /// Streaming chunk or raw-mode screen data: bytes only.
    Forward,
    /// The command finished in line mode: fresh prompt, empty line.
    ForwardAndReset,
}

pub fn plan(msg: &CommandMessage) -> OutputPlan {
    if msg.raw_mode || !msg.is_complete {
        OutputPlan::Forward
    } else {
        OutputPlan::ForwardAndReset
    }
}

#[derive(Debug, Default)]
pub struct Reconciler {
    seen_command: bool,
    seen_file: bool,
    ready: bool,
    raw_mode: bool,
    /// The cursor is somewhere after column 0 of the current row.
    line_open: bool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn raw_mode(&self) -> bool {
        self.raw_mode
    }

    pub fn line_open(&self) -> bool {
        self.line_open
    }

    /// Record a `command` frame whose output is about to be written.
    pub fn on_command(&mut self, msg: &CommandMessage) -> OutputPlan {
        self.seen_command = true;
        if msg.raw_mode != self.raw_mode {
            debug!(raw_mode = msg.raw_mode, "raw mode changed");
        }
        if msg.is_exiting_raw {
            info!("remote program left the alternate screen");
        }
        self.raw_mode = msg.raw_mode;
        self.note_output(&msg.output);
        plan(msg)
    }

    pub fn on_file(&mut self) {
        self.seen_file = true;
    }

    /// Track whether written text left the cursor mid-row.
    pub fn note_output(&mut self, text: &str) {
        if !text.is_empty() {
            self.line_open = !text.ends_with('\n');
        }
    }

    pub fn close_line(&mut self) {
        self.line_open = false;
    }

    /// `true` exactly once: the first time both a command and a file frame
    /// have been seen.
    pub fn take_ready_transition(&mut self) -> bool {
        if self.ready || !(self.seen_command && self.seen_file) {
            return false;
        }
        self.ready = true;
        info!("environment ready");
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
