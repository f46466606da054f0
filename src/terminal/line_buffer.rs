//! Locally tracked command line and the minimal redraws that keep the
//! surface in step with it.
//!
//! Every operation takes the cursor relative to the end of the prompt,
//! writes only the deltas needed on the surface, and returns the new
//! relative cursor. Cursors past the end are clamped; operations that have
//! nothing to do write nothing.

use crate::terminal::ansi::{self, CURSOR_LEFT, CURSOR_RIGHT, ERASE_TO_END};
use crate::terminal::TerminalSurface;

/// The in-progress command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    /// Hand out the line for submission and start a fresh one.
    pub fn take(&mut self) -> String {
        let line = self.as_string();
        self.chars.clear();
        line
    }

    fn clamp(&self, rel: usize) -> usize {
        rel.min(self.chars.len())
    }

    fn tail(&self, from: usize) -> String {
        self.chars[from..].iter().collect()
    }

    /// Splice `text` in at `rel`, redraw everything after it and leave the
    /// cursor right after the inserted span.
    pub fn insert(&mut self, rel: usize, text: &str, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        let inserted: Vec<char> = text.chars().collect();
        if inserted.is_empty() {
            return rel;
        }
        let count = inserted.len();
        self.chars.splice(rel..rel, inserted);

        let tail = self.tail(rel);
        out.write(&tail);
        let back = tail.chars().count() - count;
        if back > 0 {
            out.write(&ansi::move_left(back));
        }
        rel + count
    }

    /// Remove the character before the cursor.
    pub fn backspace(&mut self, rel: usize, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        if rel == 0 {
            return 0;
        }
        self.chars.remove(rel - 1);
        out.write(CURSOR_LEFT);
        self.redraw_tail(rel - 1, out);
        rel - 1
    }

    /// Remove the character under the cursor.
    pub fn delete(&mut self, rel: usize, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        if rel >= self.chars.len() {
            return rel;
        }
        self.chars.remove(rel);
        self.redraw_tail(rel, out);
        rel
    }

    /// Rewrite from `from` to the end, blank the stale last cell and return
    /// the cursor to `from`.
    fn redraw_tail(&self, from: usize, out: &mut dyn TerminalSurface) {
        let tail = self.tail(from);
        let width = tail.chars().count();
        out.write(&format!("{tail} "));
        out.write(&ansi::move_left(width + 1));
    }

    pub fn move_left(&self, rel: usize, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        if rel == 0 {
            return 0;
        }
        out.write(CURSOR_LEFT);
        rel - 1
    }

    pub fn move_right(&self, rel: usize, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        if rel >= self.chars.len() {
            return rel;
        }
        out.write(CURSOR_RIGHT);
        rel + 1
    }

    pub fn home(&self, rel: usize, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        if rel > 0 {
            out.write(&ansi::move_left(rel));
        }
        0
    }

    pub fn end(&self, rel: usize, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        let len = self.chars.len();
        if rel < len {
            out.write(&ansi::move_right(len - rel));
        }
        len
    }

    /// Jump to the start of the previous word.
    pub fn word_left(&self, rel: usize, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        let mut i = rel;
        while i > 0 && self.chars[i - 1].is_whitespace() {
            i -= 1;
        }
        if i == 0 {
            return rel;
        }
        while i > 0 && !self.chars[i - 1].is_whitespace() {
            i -= 1;
        }
        out.write(&ansi::move_left(rel - i));
        i
    }

    /// Jump to the end of the next word.
    pub fn word_right(&self, rel: usize, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        let len = self.chars.len();
        let mut i = rel;
        while i < len && self.chars[i].is_whitespace() {
            i += 1;
        }
        if i == len {
            return rel;
        }
        while i < len && !self.chars[i].is_whitespace() {
            i += 1;
        }
        out.write(&ansi::move_right(i - rel));
        i
    }

    /// Swap the whole line for `text` (history recall); cursor ends up at
    /// the end of the new line.
    pub fn replace(&mut self, rel: usize, text: &str, out: &mut dyn TerminalSurface) -> usize {
        let rel = self.clamp(rel);
        if self.as_string() == text {
            return rel;
        }
        self.chars = text.chars().collect();
        out.write(&format!("{}{text}{ERASE_TO_END}", ansi::move_left(rel)));
        self.chars.len()
    }

    /// Write the whole line at the current cursor and walk back to `rel`.
    pub fn echo(&self, rel: usize, out: &mut dyn TerminalSurface) {
        if self.chars.is_empty() {
            return;
        }
        let rel = self.clamp(rel);
        out.write(&self.as_string());
        out.write(&ansi::move_left(self.chars.len() - rel));
    }
}

/// Clipboard text made safe for a single command line.
pub fn sanitize_paste(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    text.chars()
        .filter_map(|c| match c {
            '\r' | '\n' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Previously submitted commands, newest last.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    capacity: usize,
    /// Entry currently shown while browsing, `None` when editing a new line.
    index: Option<usize>,
    /// The line being typed before browsing started.
    draft: String,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            index: None,
            draft: String::new(),
        }
    }

    /// Record a submitted command and stop browsing.
    pub fn push(&mut self, entry: &str) {
        self.index = None;
        self.draft.clear();
        let entry = entry.trim();
        if entry.is_empty() || self.entries.last().map(String::as_str) == Some(entry) {
            return;
        }
        self.entries.push(entry.to_string());
        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(0..overflow);
        }
    }

    /// Step back in time. `current` is saved as the draft on the first step.
    pub fn previous(&mut self, current: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let next = match self.index {
            None => {
                self.draft = current.to_string();
                self.entries.len() - 1
            }
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.index = Some(next);
        Some(&self.entries[next])
    }

    /// Step forward; past the newest entry the draft comes back.
    pub fn next(&mut self) -> Option<&str> {
        let i = self.index?;
        if i + 1 < self.entries.len() {
            self.index = Some(i + 1);
            Some(&self.entries[i + 1])
        } else {
            self.index = None;
            Some(&self.draft)
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
