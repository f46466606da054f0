use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::fs::mirror::FileMirror;
use crate::protocol::TreeNode;
use crate::terminal::emulator::TerminalEmulator;
use crate::terminal::resize;
use crate::terminal::session::{Dispatch, TerminalSession};
use crate::theme::ThemeColors;
use crate::transport::ChannelTransport;
use crate::ui;

/// The session as wired into the app: vte surface, websocket transport.
pub type Session = TerminalSession<TerminalEmulator, ChannelTransport>;

/// Backend socket state shown in the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

/// Main application state.
pub struct App {
    pub session: Session,
    pub connection: ConnectionState,
    pub mirror: Option<FileMirror>,
    /// Node count of the last `xoblas` listing.
    pub tree_count: Option<usize>,
    /// Lines scrolled back into history; 0 follows live output.
    pub scroll_offset: usize,
    pub theme: ThemeColors,
    pub should_quit: bool,
    /// (message, is_error, shown at)
    pub status_message: Option<(String, bool, Instant)>,
}

impl App {
    pub fn new(session: Session, mirror: Option<FileMirror>, theme: ThemeColors) -> Self {
        Self {
            session,
            connection: ConnectionState::Connecting,
            mirror,
            tree_count: None,
            scroll_offset: 0,
            theme,
            should_quit: false,
            status_message: None,
        }
    }

    /// Set a status message with current timestamp.
    pub fn set_status_message(&mut self, msg: impl Into<String>, is_error: bool) {
        self.status_message = Some((msg.into(), is_error, Instant::now()));
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, _, ref created)) = self.status_message {
            if created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// `user@host cwd` once the shell has identified itself.
    pub fn identity_label(&self) -> Option<String> {
        self.session
            .identity()
            .map(|id| format!("{}@{} {}", id.user, id.host, id.cwd))
    }

    /// Keyboard bytes for the remote shell.
    pub fn send_input(&mut self, data: &str) {
        self.scroll_offset = 0;
        self.session.handle_input(data);
    }

    /// Bracketed paste or a finished clipboard read.
    pub fn paste(&mut self, result: std::result::Result<String, String>) {
        self.scroll_offset = 0;
        self.session.on_paste(result);
    }

    pub fn tick(&mut self, now: Instant) {
        self.session.tick(now);
        self.clear_expired_status();
    }

    /// Fit the terminal panel to a new screen size.
    pub fn resize(&mut self, width: u16, height: u16) {
        let (cols, rows) = ui::terminal_area_size(width, height);
        if let Some((cols, rows)) = resize::fit(cols, rows) {
            self.session.resize(cols, rows);
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.session.surface().scrollback_len();
        self.scroll_offset = (self.scroll_offset + lines).min(max);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn on_connected(&mut self) {
        self.connection = ConnectionState::Connected;
        self.set_status_message("Connected", false);
    }

    pub fn on_connect_failed(&mut self, err: &str) {
        warn!(error = %err, "connection failed");
        self.connection = ConnectionState::Failed;
        self.session.notice(&format!("Connection failed: {err}"));
        self.set_status_message(format!("Connection failed: {err}"), true);
    }

    pub fn on_disconnected(&mut self) {
        if self.connection == ConnectionState::Failed {
            return;
        }
        info!("backend connection closed");
        self.connection = ConnectionState::Disconnected;
        self.session.reset();
        self.session.notice("Connection closed");
        self.set_status_message("Disconnected", true);
    }

    /// Route a backend frame through the session.
    pub fn handle_socket(&mut self, text: &str) {
        match self.session.on_message(text) {
            Some(Dispatch::File(file)) => {
                if let Some(mirror) = self.mirror.as_mut() {
                    if let Err(e) = mirror.apply_inbound(&file) {
                        warn!(error = %e, "mirror write failed");
                        self.set_status_message(format!("Mirror write failed: {e}"), true);
                    }
                }
            }
            Some(Dispatch::Tree(nodes)) => self.handle_tree(&nodes),
            None => {}
        }
        let retry = self.mirror.as_ref().is_some_and(FileMirror::has_unsaved);
        if retry && self.session.is_ready() {
            info!("retrying unsaved mirror edit");
            self.push_local_edit();
        }
    }

    fn handle_tree(&mut self, nodes: &[TreeNode]) {
        let count = nodes.iter().map(TreeNode::count).sum();
        info!(count, "received file tree");
        self.tree_count = Some(count);
    }

    /// The mirrored file changed on disk.
    pub fn handle_fs_change(&mut self, paths: Vec<PathBuf>) {
        debug!(?paths, "mirror change");
        self.push_local_edit();
    }

    /// Send the mirror's contents if they differ from the last synced text.
    /// A refused save stays pending and is retried once the session is ready.
    fn push_local_edit(&mut self) {
        let Some(mirror) = self.mirror.as_mut() else {
            return;
        };
        let content = match mirror.pending_change() {
            Ok(Some(content)) => content,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "mirror read failed");
                return;
            }
        };
        match self.session.save_file(content.clone()) {
            Ok(()) => {
                mirror.mark_synced(content);
                self.set_status_message("Saved main file", false);
            }
            Err(e) => {
                mirror.mark_unsaved();
                self.set_status_message(format!("Save failed: {e}"), true);
            }
        }
    }
}
