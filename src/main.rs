mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod identity;
mod protocol;
mod terminal;
mod theme;
mod transport;
mod tui;
mod ui;

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::{AppConfig, LogConfig, ServerConfig, SyncConfig};
use crate::error::AppError;
use crate::event::{Event, EventHandler};
use crate::fs::mirror::FileMirror;
use crate::fs::watcher::FsWatcher;
use crate::identity::{FileStore, IdentityProvider};
use crate::terminal::emulator::TerminalEmulator;
use crate::terminal::session::TerminalSession;
use crate::transport::ChannelTransport;
use crate::tui::{install_panic_hook, Tui};

/// Terminal client for the Xoblas coding playground.
#[derive(Parser, Debug)]
#[command(name = "xoblas", version, about)]
struct Cli {
    /// Backend base URL (ws, wss, http or https)
    #[arg(long)]
    server: Option<String>,

    /// Explicit config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mirror the container's main file to this path
    #[arg(long)]
    mirror: Option<PathBuf>,

    /// Do not send local edits of the mirror back
    #[arg(long)]
    no_watch: bool,

    /// Log file (defaults to the cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Forget the stored user id and start with a fresh container
    #[arg(long)]
    reset_identity: bool,
}

impl Cli {
    /// Config values set on the command line.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                url: self.server.clone(),
            },
            sync: SyncConfig {
                mirror_path: self
                    .mirror
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
                watch: self.no_watch.then_some(false),
                debounce_ms: None,
            },
            log: LogConfig {
                level: None,
                file: self
                    .log_file
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));
    init_logging(&config);

    let store_path = FileStore::default_path()
        .ok_or_else(|| AppError::Config("no data directory for the user id".into()))?;
    let mut identity = IdentityProvider::new(FileStore::new(store_path));
    if cli.reset_identity {
        identity.reset()?;
    }
    let user_id = identity.get_or_create()?;
    let endpoint = transport::terminal_endpoint(config.server_url(), &user_id)?;
    info!(%endpoint, "starting xoblas");

    install_panic_hook();

    let mut tui = Tui::new()?;
    let size = tui.terminal_mut().size()?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let event_tx = events.sender();

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (cols, rows) = ui::terminal_area_size(size.width, size.height);
    let emulator = TerminalEmulator::new(rows as usize, cols as usize)
        .with_scrollback(config.scrollback())
        .with_convert_eol(config.convert_eol());
    let session = TerminalSession::new(
        emulator,
        ChannelTransport::new(out_tx),
        config.session_options(),
    );
    let mirror = config.mirror_path().map(FileMirror::new);
    let mut app = App::new(session, mirror, theme::resolve_theme(&config.theme));
    app.resize(size.width, size.height);

    // Initialize the mirror watcher (unless --no-watch)
    let _watcher = match app.mirror.as_ref() {
        Some(mirror) if config.watch_enabled() => match FsWatcher::new(
            mirror.path(),
            Duration::from_millis(config.debounce_ms()),
            event_tx.clone(),
        ) {
            Ok(watcher) => {
                info!(path = %watcher.target().display(), "watching mirror");
                Some(watcher)
            }
            Err(e) => {
                warn!(error = %e, "file watcher unavailable");
                app.set_status_message(format!("Watcher unavailable: {e}"), true);
                None
            }
        },
        _ => None,
    };

    let socket_tx = event_tx.clone();
    tokio::spawn(async move {
        if let Err(err) = transport::connect(&endpoint, out_rx, socket_tx.clone()).await {
            let _ = socket_tx.send(Event::ConnectFailed(err.to_string()));
        }
    });

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Paste(text) => app.paste(Ok(text)),
            Event::Tick => app.tick(Instant::now()),
            Event::Resize(width, height) => app.resize(width, height),
            Event::Connected => app.on_connected(),
            Event::ConnectFailed(err) => app.on_connect_failed(&err),
            Event::Socket(text) => app.handle_socket(&text),
            Event::Disconnected => app.on_disconnected(),
            Event::Clipboard(result) => app.paste(result),
            Event::FsChange(paths) => app.handle_fs_change(paths),
        }

        if app.session.take_paste_request() {
            spawn_clipboard_read(event_tx.clone());
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    info!("xoblas exited");
    Ok(())
}

/// Read the system clipboard off the event loop.
fn spawn_clipboard_read(tx: mpsc::UnboundedSender<Event>) {
    tokio::task::spawn_blocking(move || {
        let result = arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.get_text())
            .map_err(|e| e.to_string());
        let _ = tx.send(Event::Clipboard(result));
    });
}

/// Log to a file since stdout belongs to the TUI; discard logs when the
/// file cannot be opened.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    match config.log_file().map(|path| open_log_file(&path)) {
        Some(Ok(file)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        _ => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_become_overrides() {
        let cli = Cli::parse_from([
            "xoblas",
            "--server",
            "https://play.example.com",
            "--mirror",
            "/tmp/main.py",
            "--no-watch",
        ]);
        let cfg = AppConfig::default().merge(&cli.overrides());
        assert_eq!(cfg.server_url(), "https://play.example.com");
        assert_eq!(cfg.mirror_path(), Some(PathBuf::from("/tmp/main.py")));
        assert!(!cfg.watch_enabled());
        assert!(!cli.reset_identity);
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let cli = Cli::parse_from(["xoblas"]);
        let base = AppConfig {
            sync: SyncConfig {
                watch: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let cfg = base.merge(&cli.overrides());
        assert!(cfg.watch_enabled());
        assert_eq!(cfg.server_url(), config::DEFAULT_SERVER_URL);
    }

    #[test]
    fn log_file_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("xoblas.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
