//! The terminal session: sole owner of the line buffer and prompt state.
//!
//! Keystrokes, backend frames, clipboard results, resizes and ticks all
//! arrive as `&mut self` calls from the app's event loop, so edits are
//! applied one at a time in arrival order.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::protocol::{self, CommandMessage, FileMessage, InboundMessage, OutboundMessage, TreeNode};
use crate::terminal::ansi::{CLEAR_LINE, CRLF, QUERY_CURSOR, SAVE_CURSOR};
use crate::terminal::keys::{classify, KeyInput, SpecialKey};
use crate::terminal::line_buffer::{sanitize_paste, History, LineBuffer};
use crate::terminal::oracle::{parse_report, CursorOracle, CursorPosition, PendingInput, Report};
use crate::terminal::prompt::{create_prompt, Prompt, SessionIdentity};
use crate::terminal::reconciler::{OutputPlan, Reconciler};
use crate::terminal::resize::ResizeNegotiator;
use crate::terminal::TerminalSurface;
use crate::transport::Transport;

pub const NOT_CONNECTED: &str = "Not connected to server";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub query_timeout: Duration,
    pub max_pending_inputs: usize,
    pub history_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_millis(100),
            max_pending_inputs: 64,
            history_size: 500,
        }
    }
}

/// Frames handed to collaborators outside the terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    File(FileMessage),
    Tree(Vec<TreeNode>),
}

pub struct TerminalSession<S, T> {
    surface: S,
    transport: T,
    prompt: Prompt,
    identity: Option<SessionIdentity>,
    line: LineBuffer,
    /// Tracked cursor relative to the end of the prompt.
    cursor: usize,
    history: History,
    oracle: CursorOracle,
    reconciler: Reconciler,
    negotiator: ResizeNegotiator,
    paste_requested: bool,
}

impl<S: TerminalSurface, T: Transport> TerminalSession<S, T> {
    pub fn new(surface: S, transport: T, options: SessionOptions) -> Self {
        Self {
            surface,
            transport,
            prompt: Prompt::minimal(),
            identity: None,
            line: LineBuffer::new(),
            cursor: 0,
            history: History::new(options.history_size),
            oracle: CursorOracle::new(options.query_timeout, options.max_pending_inputs),
            reconciler: Reconciler::new(),
            negotiator: ResizeNegotiator::new(),
            paste_requested: false,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.reconciler.is_ready()
    }

    pub fn raw_mode(&self) -> bool {
        self.reconciler.raw_mode()
    }

    /// Keyboard bytes (xterm encoding) or a reply produced by the surface.
    pub fn handle_input(&mut self, data: &str) {
        self.accept_input(data);
        self.pump(Instant::now());
    }

    /// A raw text frame from the backend. File and tree frames are returned
    /// for the caller to route.
    pub fn on_message(&mut self, text: &str) -> Option<Dispatch> {
        let message = protocol::decode(text)?;
        let dispatch = match message {
            InboundMessage::Command(command) => {
                self.apply_command(&command);
                None
            }
            InboundMessage::File(file) => {
                self.reconciler.on_file();
                Some(Dispatch::File(file))
            }
            InboundMessage::Xoblas(tree) => {
                // The tree is the only reply an `xoblas` command gets.
                if !self.reconciler.raw_mode() {
                    self.finish_command();
                }
                Some(Dispatch::Tree(tree.file_structure))
            }
            InboundMessage::Event(payload) => {
                debug!(%payload, "backend event ignored");
                None
            }
        };
        if self.reconciler.take_ready_transition() {
            self.flush_size();
        }
        self.pump(Instant::now());
        dispatch
    }

    /// Result of a clipboard read started after a paste request.
    pub fn on_paste(&mut self, result: std::result::Result<String, String>) {
        let text = match result {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "clipboard read failed");
                return;
            }
        };
        if self.reconciler.raw_mode() {
            self.forward_raw(&text);
            return;
        }
        let text = sanitize_paste(&text);
        if text.is_empty() {
            return;
        }
        self.oracle.enqueue(text);
        self.pump(Instant::now());
    }

    /// `true` once after the user asked to paste from the clipboard.
    pub fn take_paste_request(&mut self) -> bool {
        std::mem::take(&mut self.paste_requested)
    }

    /// Expire an overdue cursor query.
    pub fn tick(&mut self, now: Instant) {
        if let Some(input) = self.oracle.expire(now) {
            self.dispatch(input, None);
        }
        self.pump(now);
    }

    /// Apply a fitted `(cols, rows)` observation.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if !self.negotiator.observe(cols, rows) {
            return;
        }
        self.surface.resize(cols, rows);
        if !self.reconciler.is_ready() {
            debug!(cols, rows, "resized locally, backend not ready");
            return;
        }
        if !self.reconciler.raw_mode() {
            self.redraw_line();
        }
        if let Err(err) = self.send(&OutboundMessage::Resize { cols, rows }) {
            warn!(error = %err, "resize not sent");
        }
    }

    /// Write a status line of our own, e.g. connection changes.
    pub fn notice(&mut self, text: &str) {
        if self.reconciler.line_open() {
            self.surface.write(CRLF);
        }
        self.surface.writeln(text);
        self.reconciler.close_line();
    }

    /// Send new contents of the container's main file.
    pub fn save_file(&mut self, content: String) -> Result<()> {
        self.send(&OutboundMessage::WriteFile { content })
    }

    /// Forget all per-connection state.
    pub fn reset(&mut self) {
        self.oracle.reset();
        self.reconciler.reset();
        self.line.clear();
        self.cursor = 0;
        self.identity = None;
        self.prompt = Prompt::minimal();
        self.paste_requested = false;
        info!("terminal session reset");
    }

    fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        if !self.reconciler.is_ready() {
            return Err(AppError::Transport("environment not ready".into()));
        }
        self.transport.send(message)
    }

    fn accept_input(&mut self, data: &str) {
        if let Some(position) = parse_report(data) {
            match self.oracle.on_report() {
                Report::Answer(input) => self.dispatch(input, Some(position)),
                Report::Late => debug!("discarding late cursor report"),
                Report::Unsolicited if self.reconciler.raw_mode() => self.forward_raw(data),
                Report::Unsolicited => debug!("discarding unsolicited cursor report"),
            }
            return;
        }
        if self.reconciler.raw_mode() {
            self.forward_raw(data);
            return;
        }
        if self.oracle.enqueue(data.to_string()) {
            debug!(pending = self.oracle.pending(), "input queued");
        }
    }

    /// Release or query queued inputs and feed surface replies back in until
    /// nothing is left to do.
    fn pump(&mut self, now: Instant) {
        loop {
            if self.oracle.quarantined(now) {
                while let Some(input) = self.oracle.pop_estimated() {
                    self.dispatch(input, None);
                }
            } else if self.oracle.start_query(now) {
                self.surface.write(QUERY_CURSOR);
            }
            let replies = self.surface.take_replies();
            if replies.is_empty() {
                break;
            }
            for reply in replies {
                self.accept_input(&reply);
            }
        }
    }

    fn forward_raw(&mut self, data: &str) {
        let message = OutboundMessage::Input {
            special_key: SpecialKey::from_data(data).as_str().to_string(),
            data: data.to_string(),
        };
        if let Err(err) = self.send(&message) {
            debug!(error = %err, "raw input dropped");
        }
    }

    fn dispatch(&mut self, input: PendingInput, position: Option<CursorPosition>) {
        if self.reconciler.raw_mode() {
            self.forward_raw(&input.data);
            return;
        }
        let rel = self.resolve_cursor(position);
        debug!(seq = input.seq, rel, "applying input");
        self.apply_key(&input.data, rel);
    }

    /// Relative cursor from a report, or the tracked one when there is no
    /// report or the line wraps (a single-row column says nothing then).
    fn resolve_cursor(&self, position: Option<CursorPosition>) -> usize {
        let Some(position) = position else {
            return self.cursor;
        };
        if self.prompt.visible_len + self.line.len() >= self.surface.cols() as usize {
            return self.cursor;
        }
        let rel = position.x.saturating_sub(self.prompt.visible_len);
        if rel != self.cursor {
            debug!(reported = rel, tracked = self.cursor, "cursor drift");
        }
        rel
    }

    fn apply_key(&mut self, data: &str, rel: usize) {
        let key = classify(data);
        match key {
            KeyInput::Enter => return self.submit(),
            KeyInput::Paste => {
                self.paste_requested = true;
                return;
            }
            KeyInput::Unknown => {
                debug!(?data, "unhandled key");
                return;
            }
            _ => {}
        }

        let out: &mut dyn TerminalSurface = &mut self.surface;
        let line = &mut self.line;
        self.cursor = match key {
            KeyInput::Text(text) => line.insert(rel, &text, out),
            KeyInput::Backspace => line.backspace(rel, out),
            KeyInput::Delete => line.delete(rel, out),
            KeyInput::Left => line.move_left(rel, out),
            KeyInput::Right => line.move_right(rel, out),
            KeyInput::Home => line.home(rel, out),
            KeyInput::End => line.end(rel, out),
            KeyInput::WordLeft => line.word_left(rel, out),
            KeyInput::WordRight => line.word_right(rel, out),
            KeyInput::Up => match self.history.previous(&line.as_string()) {
                Some(entry) => line.replace(rel, entry, out),
                None => rel,
            },
            KeyInput::Down => match self.history.next() {
                Some(entry) => line.replace(rel, entry, out),
                None => rel,
            },
            KeyInput::Enter | KeyInput::Paste | KeyInput::Unknown => rel,
        };
    }

    fn submit(&mut self) {
        let command = self.line.take().trim().to_string();
        self.cursor = 0;
        self.surface.write(CRLF);
        self.reconciler.close_line();
        self.history.push(&command);
        info!(%command, "submitting command");
        if let Err(err) = self.send(&OutboundMessage::Command { command }) {
            warn!(error = %err, "command not sent");
            self.surface.writeln(NOT_CONNECTED);
            self.draw_prompt();
        }
    }

    fn apply_command(&mut self, command: &CommandMessage) {
        let plan = self.reconciler.on_command(command);
        self.surface.write(&command.output);
        if plan == OutputPlan::ForwardAndReset {
            self.identity = Some(SessionIdentity::from_message(command));
            self.finish_command();
        }
    }

    /// Close any open output line and start a fresh prompt.
    fn finish_command(&mut self) {
        if self.reconciler.line_open() {
            self.surface.write(CRLF);
        }
        self.line.clear();
        self.cursor = 0;
        self.draw_prompt();
    }

    fn draw_prompt(&mut self) {
        self.prompt = create_prompt(self.surface.cols() as usize, self.identity.as_ref());
        self.surface.write(&self.prompt.text);
        self.surface.write(SAVE_CURSOR);
        self.reconciler.note_output(&self.prompt.text);
    }

    /// Re-render prompt and line in place after a width change.
    fn redraw_line(&mut self) {
        self.surface.write(CLEAR_LINE);
        self.draw_prompt();
        self.line.echo(self.cursor, &mut self.surface);
    }

    fn flush_size(&mut self) {
        let Some((cols, rows)) = self.negotiator.last() else {
            return;
        };
        if let Err(err) = self.send(&OutboundMessage::Resize { cols, rows }) {
            warn!(error = %err, "initial size not sent");
        }
    }
}

#[cfg(test)]
impl<S, T> TerminalSession<S, T> {
    pub(crate) fn line(&self) -> String {
        self.line.as_string()
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::emulator::TerminalEmulator;
    use crate::terminal::testing::RecordingSurface;

    #[derive(Debug, Default)]
    struct RecordingTransport {
        sent: Vec<OutboundMessage>,
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, message: &OutboundMessage) -> Result<()> {
            self.sent.push(message.clone());
            Ok(())
        }
    }

    fn command_frame(output: &str, raw_mode: bool, is_complete: bool) -> String {
        serde_json::json!({
            "type": "command",
            "host": "h",
            "user": "u",
            "cwd": "/root",
            "output": output,
            "raw_mode": raw_mode,
            "is_complete": is_complete,
        })
        .to_string()
    }

    fn file_frame() -> String {
        r#"{"type":"file","file_path":"","content":"print(1)"}"#.to_string()
    }

    fn emulator() -> TerminalEmulator {
        TerminalEmulator::new(24, 80).with_convert_eol(true)
    }

    fn ready<S: TerminalSurface>(surface: S) -> TerminalSession<S, RecordingTransport> {
        let mut session =
            TerminalSession::new(surface, RecordingTransport::default(), SessionOptions::default());
        session.on_message(&command_frame("", false, true));
        session.on_message(&file_frame());
        assert!(session.is_ready());
        session
    }

    fn type_keys<S: TerminalSurface>(session: &mut TerminalSession<S, RecordingTransport>, keys: &[&str]) {
        for key in keys {
            session.handle_input(key);
        }
    }

    fn queries(surface: &RecordingSurface) -> usize {
        surface.writes.iter().filter(|w| w.as_str() == QUERY_CURSOR).count()
    }

    #[test]
    fn command_round_trip() {
        let mut session = ready(emulator());
        type_keys(&mut session, &["l", "s"]);
        assert_eq!(session.surface().row_text(0), "[u@h /root]$ ls");
        assert_eq!(session.line(), "ls");

        session.handle_input("\r");
        assert_eq!(
            session.transport().sent,
            vec![OutboundMessage::Command {
                command: "ls".into()
            }]
        );
        assert_eq!(session.line(), "");

        session.on_message(&command_frame("file1\nfile2\n", false, true));
        let screen = session.surface();
        assert_eq!(screen.row_text(1), "file1");
        assert_eq!(screen.row_text(2), "file2");
        assert_eq!(screen.row_text(3), "[u@h /root]$");
        assert_eq!(screen.cursor_position(), (3, 13));
    }

    #[test]
    fn complete_output_is_followed_by_prompt() {
        let mut session = ready(RecordingSurface::new(80));
        session.surface_mut().clear();
        session.on_message(&command_frame("file1\nfile2\n", false, true));
        let output = session.surface().output();
        let expected = format!(
            "file1\nfile2\n{}{SAVE_CURSOR}",
            create_prompt(80, Some(&SessionIdentity::new("u", "h", "/root"))).text
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn partial_output_does_not_redraw() {
        let mut session = ready(RecordingSurface::new(80));
        session.surface_mut().clear();
        session.on_message(&command_frame("compiling", false, false));
        assert_eq!(session.surface().output(), "compiling");

        session.on_message(&command_frame("", false, true));
        let output = session.surface().output();
        assert!(output.starts_with("compiling\r\n["), "{output:?}");
    }

    #[test]
    fn raw_mode_passthrough() {
        let mut session = ready(emulator());
        session.on_message(&command_frame("", true, true));
        assert!(session.raw_mode());
        let before = session.surface().row_text(0);
        let cursor = session.surface().cursor_position();

        session.handle_input("q");
        assert_eq!(
            session.transport().sent,
            vec![OutboundMessage::Input {
                special_key: "Unknown".into(),
                data: "q".into()
            }]
        );
        assert_eq!(session.line(), "");
        assert_eq!(session.surface().row_text(0), before);
        assert_eq!(session.surface().cursor_position(), cursor);

        session.handle_input("\x1b[A");
        assert_eq!(
            session.transport().sent[1],
            OutboundMessage::Input {
                special_key: "ArrowUp".into(),
                data: "\x1b[A".into()
            }
        );
    }

    #[test]
    fn raw_mode_redraw_reply_reaches_the_screen() {
        let mut session = ready(RecordingSurface::new(80));
        session.on_message(&command_frame("", true, false));
        session.surface_mut().clear();

        session.on_message(
            r#"{"type":"command","output":"REDRAWN","cwd":"","user":"","host":"","raw_mode":true,"is_exiting_raw":""}"#,
        );
        assert_eq!(session.surface().output(), "REDRAWN");
        assert!(session.raw_mode());
        assert_eq!(session.line(), "");
    }

    #[test]
    fn leaving_raw_mode_restores_line_editing() {
        let mut session = ready(emulator());
        session.on_message(&command_frame("", true, false));
        session.handle_input("q");
        assert!(session.raw_mode());

        let exit = serde_json::json!({
            "type": "command",
            "host": "h",
            "user": "u",
            "cwd": "/root",
            "output": "",
            "raw_mode": false,
            "is_complete": true,
            "is_exiting_raw": true,
        })
        .to_string();
        session.on_message(&exit);
        assert!(!session.raw_mode());
        assert_eq!(session.line(), "");
        assert_eq!(session.cursor(), 0);
        let (row, _) = session.surface().cursor_position();
        assert_eq!(session.surface().row_text(row), "[u@h /root]$");

        type_keys(&mut session, &["l", "s"]);
        assert_eq!(session.line(), "ls");
        assert_eq!(session.surface().row_text(row), "[u@h /root]$ ls");
        assert_eq!(
            session.transport().sent,
            vec![OutboundMessage::Input {
                special_key: "Unknown".into(),
                data: "q".into()
            }]
        );
    }

    #[test]
    fn repeated_resize_is_sent_once() {
        let mut session = ready(emulator());
        session.resize(100, 30);
        session.resize(100, 30);
        let resizes: Vec<_> = session
            .transport()
            .sent
            .iter()
            .filter(|m| matches!(m, OutboundMessage::Resize { .. }))
            .collect();
        assert_eq!(resizes, vec![&OutboundMessage::Resize { cols: 100, rows: 30 }]);
        assert_eq!(session.surface().visible_cols(), 100);
    }

    #[test]
    fn resize_before_ready_is_local_then_flushed() {
        let mut session = TerminalSession::new(
            emulator(),
            RecordingTransport::default(),
            SessionOptions::default(),
        );
        session.resize(60, 20);
        assert_eq!(session.surface().visible_cols(), 60);
        assert!(session.transport().sent.is_empty());

        session.on_message(&command_frame("", false, true));
        assert!(session.transport().sent.is_empty());
        session.on_message(&file_frame());
        assert_eq!(
            session.transport().sent,
            vec![OutboundMessage::Resize { cols: 60, rows: 20 }]
        );
    }

    #[test]
    fn resize_redraws_line_in_place() {
        let mut session = ready(emulator());
        type_keys(&mut session, &["e", "c", "h", "o", "\x1b[D"]);
        session.resize(40, 24);
        let screen = session.surface();
        assert_eq!(screen.row_text(0), "[u@h /root]$ echo");
        assert_eq!(screen.cursor_position(), (0, 16));
        assert_eq!(session.cursor(), 3);
    }

    #[test]
    fn enter_before_ready_reports_not_connected() {
        let mut session = TerminalSession::new(
            emulator(),
            RecordingTransport::default(),
            SessionOptions::default(),
        );
        session.on_message(&command_frame("", false, true));
        type_keys(&mut session, &["l", "s", "\r"]);
        assert!(session.transport().sent.is_empty());
        let screen = session.surface();
        assert_eq!(screen.row_text(0), "[u@h /root]$ ls");
        assert_eq!(screen.row_text(1), NOT_CONNECTED);
        assert_eq!(screen.row_text(2), "[u@h /root]$");
    }

    #[test]
    fn keystrokes_wait_for_their_own_report() {
        let mut session = ready(RecordingSurface::new(80));
        session.surface_mut().clear();
        session.handle_input("a");
        session.handle_input("b");
        assert_eq!(queries(session.surface()), 1);
        assert_eq!(session.line(), "");

        session.handle_input("\x1b[1;14R");
        assert_eq!(session.line(), "a");
        assert_eq!(queries(session.surface()), 2);

        session.handle_input("\x1b[1;15R");
        assert_eq!(session.line(), "ab");
        assert_eq!(session.cursor(), 2);
    }

    #[test]
    fn reported_cursor_positions_edit() {
        let mut session = ready(RecordingSurface::new(80));
        for (key, report) in [("a", "\x1b[1;14R"), ("c", "\x1b[1;15R"), ("b", "\x1b[1;15R")] {
            session.handle_input(key);
            session.handle_input(report);
        }
        assert_eq!(session.line(), "abc");
    }

    #[test]
    fn timeout_falls_back_to_estimate_and_drops_late_report() {
        let mut session = ready(RecordingSurface::new(80));
        session.surface_mut().clear();
        session.handle_input("x");
        assert_eq!(session.line(), "");

        session.tick(Instant::now() + Duration::from_millis(150));
        assert_eq!(session.line(), "x");

        session.handle_input("y");
        assert_eq!(session.line(), "xy");
        assert_eq!(queries(session.surface()), 1);

        session.handle_input("\x1b[1;14R");
        assert_eq!(session.line(), "xy");
        assert_eq!(session.cursor(), 2);
        assert!(session.transport().sent.is_empty());
    }

    #[test]
    fn unsolicited_reports() {
        let mut session = ready(RecordingSurface::new(80));
        let sent_before = session.transport().sent.len();
        session.handle_input("\x1b[5;1R");
        assert_eq!(session.line(), "");
        assert_eq!(session.transport().sent.len(), sent_before);

        session.on_message(&command_frame("", true, false));
        session.handle_input("\x1b[5;1R");
        assert_eq!(
            session.transport().sent.last(),
            Some(&OutboundMessage::Input {
                special_key: "Unknown".into(),
                data: "\x1b[5;1R".into()
            })
        );
    }

    #[test]
    fn file_and_tree_frames_are_dispatched() {
        let mut session = ready(emulator());
        let file = session.on_message(&file_frame());
        assert!(matches!(file, Some(Dispatch::File(f)) if f.content == "print(1)"));

        type_keys(&mut session, &["x", "o", "b", "l", "a", "s", "\r"]);
        let tree = session.on_message(
            r#"{"type":"xoblas","file_structure":[{"type":"file","name":"main.py"}]}"#,
        );
        match tree {
            Some(Dispatch::Tree(nodes)) => assert_eq!(nodes[0].name, "main.py"),
            other => panic!("unexpected {other:?}"),
        }
        let screen = session.surface();
        assert_eq!(screen.row_text(0), "[u@h /root]$ xoblas");
        assert_eq!(screen.row_text(1), "[u@h /root]$");
    }

    #[test]
    fn save_file_requires_readiness() {
        let mut session = TerminalSession::new(
            RecordingSurface::new(80),
            RecordingTransport::default(),
            SessionOptions::default(),
        );
        assert!(session.save_file("x = 1".into()).is_err());

        let mut session = ready(RecordingSurface::new(80));
        session.save_file("x = 1".into()).unwrap();
        assert_eq!(
            session.transport().sent.last(),
            Some(&OutboundMessage::WriteFile {
                content: "x = 1".into()
            })
        );
    }

    #[test]
    fn malformed_frames_are_ignored() {
        let mut session = ready(emulator());
        assert_eq!(session.on_message("{not json"), None);
        assert_eq!(session.on_message(r#"{"type":"mystery"}"#), None);
        assert_eq!(session.on_message(r#"{"type":"event","name":"ping"}"#), None);
        type_keys(&mut session, &["o", "k"]);
        assert_eq!(session.line(), "ok");
    }

    #[test]
    fn paste_inserts_sanitized_text() {
        let mut session = ready(emulator());
        type_keys(&mut session, &["e", "c", "h", "o", " ", "\x16"]);
        assert!(session.take_paste_request());
        assert!(!session.take_paste_request());

        session.on_paste(Ok("hi\tthere\n".into()));
        assert_eq!(session.line(), "echo hi there ");
        session.on_paste(Err("clipboard unavailable".into()));
        assert_eq!(session.line(), "echo hi there ");
        assert_eq!(session.surface().row_text(0), "[u@h /root]$ echo hi there");
    }

    #[test]
    fn history_recall() {
        let mut session = ready(emulator());
        type_keys(&mut session, &["p", "w", "d", "\r"]);
        session.on_message(&command_frame("/root\n", false, true));
        type_keys(&mut session, &["l", "\x1b[A"]);
        assert_eq!(session.line(), "pwd");
        assert_eq!(session.surface().row_text(2), "[u@h /root]$ pwd");
        session.handle_input("\x1b[B");
        assert_eq!(session.line(), "l");
        assert_eq!(session.surface().row_text(2), "[u@h /root]$ l");
    }

    #[test]
    fn editing_keys_through_the_oracle() {
        let mut session = ready(emulator());
        type_keys(
            &mut session,
            &["a", "b", "c", "\x1b[D", "\x1b[D", "\x7f", "\x1b[F", "d", "\x1b[H", "\x1b[3~"],
        );
        assert_eq!(session.line(), "cd");
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.surface().row_text(0), "[u@h /root]$ cd");
        assert_eq!(session.surface().cursor_position(), (0, 13));
    }

    #[test]
    fn reset_forgets_connection_state() {
        let mut session = ready(emulator());
        type_keys(&mut session, &["l"]);
        session.reset();
        assert!(!session.is_ready());
        assert!(!session.raw_mode());
        assert_eq!(session.line(), "");
        assert!(session.identity().is_none());

        type_keys(&mut session, &["l", "s", "\r"]);
        assert!(session.transport().sent.is_empty());
    }
}
