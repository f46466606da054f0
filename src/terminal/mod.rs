//! Remote terminal panel: the surface that renders bytes, and the protocol
//! layer that turns keystrokes and backend frames into line edits.

pub mod ansi;
pub mod emulator;
pub mod keys;
pub mod line_buffer;
pub mod oracle;
pub mod prompt;
pub mod reconciler;
pub mod resize;
pub mod session;

/// The rendering surface the session writes to.
pub trait TerminalSurface {
    /// Feed bytes (text and escape sequences) to the surface.
    fn write(&mut self, data: &str);

    /// Write `data` followed by a line break.
    fn writeln(&mut self, data: &str) {
        self.write(data);
        self.write(ansi::CRLF);
    }

    /// Change the logical size of the surface.
    fn resize(&mut self, cols: u16, rows: u16);

    /// Current width in columns.
    fn cols(&self) -> u16;

    /// Bytes the surface wants to send back as input (e.g. cursor position
    /// reports), oldest first.
    fn take_replies(&mut self) -> Vec<String> {
        Vec::new()
    }
}
