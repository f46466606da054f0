//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--server`, `--mirror`, `--no-watch`, `--log-file`)
//! 2. Explicit `--config` file
//! 3. `$XOBLAS_CONFIG` environment variable (path to config file)
//! 4. Project-local `.xoblas.toml` in the current working directory
//! 5. Global `~/.config/xoblas/config.toml`
//! 6. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::terminal::session::SessionOptions;

// ── Section configs ──────────────────────────────────────────────────────────

/// Backend connection settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the playground backend (`ws`, `wss`, `http` or `https`).
    pub url: Option<String>,
}

/// Terminal panel and line-editing settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TerminalConfig {
    /// How long a keystroke waits for a cursor report before the position
    /// is estimated.
    pub cursor_query_timeout_ms: Option<u64>,
    /// Keystrokes allowed to queue behind cursor queries.
    pub max_pending_inputs: Option<usize>,
    /// Submitted commands kept for Up/Down recall.
    pub history_size: Option<usize>,
    /// Scrollback lines kept by the emulator.
    pub scrollback: Option<usize>,
    /// Treat bare `\n` in backend output as `\r\n`.
    pub convert_eol: Option<bool>,
}

/// Local mirror of the container's main file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// Where to mirror the file. Mirroring is off when unset.
    pub mirror_path: Option<String>,
    /// Send local edits of the mirror back to the backend.
    pub watch: Option<bool>,
    /// Debounce interval in milliseconds.
    pub debounce_ms: Option<u64>,
}

/// Log output.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub terminal_bg: Option<String>,
    pub terminal_fg: Option<String>,
    pub cursor_bg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub terminal: TerminalConfig,
    pub sync: SyncConfig,
    pub log: LogConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8000";
pub const DEFAULT_CURSOR_QUERY_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_MAX_PENDING_INPUTS: usize = 64;
pub const DEFAULT_HISTORY_SIZE: usize = 500;
pub const DEFAULT_SCROLLBACK: usize = 1000;
/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path — that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var("XOBLAS_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".xoblas.toml"));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("xoblas").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse config file");
            None
        }
    }
}

/// Expand a leading `~/` against the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self` — `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                url: other.server.url.clone().or(self.server.url),
            },
            terminal: TerminalConfig {
                cursor_query_timeout_ms: other
                    .terminal
                    .cursor_query_timeout_ms
                    .or(self.terminal.cursor_query_timeout_ms),
                max_pending_inputs: other
                    .terminal
                    .max_pending_inputs
                    .or(self.terminal.max_pending_inputs),
                history_size: other.terminal.history_size.or(self.terminal.history_size),
                scrollback: other.terminal.scrollback.or(self.terminal.scrollback),
                convert_eol: other.terminal.convert_eol.or(self.terminal.convert_eol),
            },
            sync: SyncConfig {
                mirror_path: other.sync.mirror_path.clone().or(self.sync.mirror_path),
                watch: other.sync.watch.or(self.sync.watch),
                debounce_ms: other.sync.debounce_ms.or(self.sync.debounce_ms),
            },
            log: LogConfig {
                level: other.log.level.clone().or(self.log.level),
                file: other.log.file.clone().or(self.log.file),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: other.theme.custom.clone().or(self.theme.custom),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            match load_file(cli_path) {
                Some(file_cfg) => config = config.merge(&file_cfg),
                None => warn!(path = %cli_path.display(), "config file not loaded"),
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn server_url(&self) -> &str {
        self.server.url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn cursor_query_timeout(&self) -> Duration {
        Duration::from_millis(
            self.terminal
                .cursor_query_timeout_ms
                .unwrap_or(DEFAULT_CURSOR_QUERY_TIMEOUT_MS),
        )
    }

    pub fn max_pending_inputs(&self) -> usize {
        self.terminal
            .max_pending_inputs
            .unwrap_or(DEFAULT_MAX_PENDING_INPUTS)
    }

    pub fn history_size(&self) -> usize {
        self.terminal.history_size.unwrap_or(DEFAULT_HISTORY_SIZE)
    }

    pub fn scrollback(&self) -> usize {
        self.terminal.scrollback.unwrap_or(DEFAULT_SCROLLBACK)
    }

    pub fn convert_eol(&self) -> bool {
        self.terminal.convert_eol.unwrap_or(true)
    }

    /// Options for the terminal session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            query_timeout: self.cursor_query_timeout(),
            max_pending_inputs: self.max_pending_inputs(),
            history_size: self.history_size(),
        }
    }

    /// Mirror file location, if mirroring is on.
    pub fn mirror_path(&self) -> Option<PathBuf> {
        self.sync.mirror_path.as_deref().map(expand_home)
    }

    /// Whether local edits of the mirror are sent back.
    pub fn watch_enabled(&self) -> bool {
        self.sync.watch.unwrap_or(true)
    }

    /// Watcher debounce interval in milliseconds.
    pub fn debounce_ms(&self) -> u64 {
        self.sync.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or("info")
    }

    /// Log file; defaults to `<cache dir>/xoblas/xoblas.log`.
    pub fn log_file(&self) -> Option<PathBuf> {
        match self.log.file.as_deref() {
            Some(path) => Some(expand_home(path)),
            None => dirs::cache_dir().map(|dir| dir.join("xoblas").join("xoblas.log")),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server_url(), "ws://localhost:8000");
        assert_eq!(cfg.cursor_query_timeout(), Duration::from_millis(100));
        assert_eq!(cfg.max_pending_inputs(), 64);
        assert_eq!(cfg.history_size(), 500);
        assert_eq!(cfg.scrollback(), 1000);
        assert!(cfg.convert_eol());
        assert!(cfg.mirror_path().is_none());
        assert!(cfg.watch_enabled());
        assert_eq!(cfg.debounce_ms(), 300);
        assert_eq!(cfg.log_level(), "info");
        assert!(cfg.theme.scheme.is_none());
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[server]
url = "wss://play.example.com"

[terminal]
cursor_query_timeout_ms = 250
max_pending_inputs = 8
history_size = 20
scrollback = 5000
convert_eol = false

[sync]
mirror_path = "/tmp/main.py"
watch = false
debounce_ms = 500

[log]
level = "debug"
file = "/tmp/xoblas.log"

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.server_url(), "wss://play.example.com");
        assert_eq!(cfg.cursor_query_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.max_pending_inputs(), 8);
        assert_eq!(cfg.history_size(), 20);
        assert_eq!(cfg.scrollback(), 5000);
        assert!(!cfg.convert_eol());
        assert_eq!(cfg.mirror_path(), Some(PathBuf::from("/tmp/main.py")));
        assert!(!cfg.watch_enabled());
        assert_eq!(cfg.debounce_ms(), 500);
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.log_file(), Some(PathBuf::from("/tmp/xoblas.log")));
        assert_eq!(cfg.theme.scheme.as_deref(), Some("light"));

        let options = cfg.session_options();
        assert_eq!(options.query_timeout, Duration::from_millis(250));
        assert_eq!(options.max_pending_inputs, 8);
        assert_eq!(options.history_size, 20);
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[terminal]
history_size = 10
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.history_size(), 10);
        assert_eq!(cfg.max_pending_inputs(), 64);
        assert_eq!(cfg.server_url(), DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert_eq!(cfg.server_url(), DEFAULT_SERVER_URL);
        assert!(cfg.watch_enabled());
    }

    #[test]
    fn test_home_expansion() {
        let cfg = AppConfig {
            sync: SyncConfig {
                mirror_path: Some("~/xoblas/main.py".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        if let Some(home) = dirs::home_dir() {
            assert_eq!(cfg.mirror_path(), Some(home.join("xoblas/main.py")));
        }
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            server: ServerConfig {
                url: Some("ws://base:1".into()),
            },
            terminal: TerminalConfig {
                history_size: Some(50),
                scrollback: Some(200),
                ..Default::default()
            },
            ..Default::default()
        };

        let over = AppConfig {
            terminal: TerminalConfig {
                history_size: Some(100),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert_eq!(merged.server_url(), "ws://base:1");
        assert_eq!(merged.history_size(), 100);
        assert_eq!(merged.scrollback(), 200);
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            sync: SyncConfig {
                watch: Some(false),
                debounce_ms: Some(500),
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = base.merge(&AppConfig::default());
        assert!(!merged.watch_enabled());
        assert_eq!(merged.debounce_ms(), 500);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[server]
url = "http://localhost:9000"

[terminal]
scrollback = 42
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.server_url(), "http://localhost:9000");
        assert_eq!(cfg.scrollback(), 42);
        assert_eq!(cfg.history_size(), DEFAULT_HISTORY_SIZE);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[server]
url = "ws://from-file:8000"

[sync]
debounce_ms = 750
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            server: ServerConfig {
                url: Some("ws://from-cli:8000".into()),
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.server_url(), "ws://from-cli:8000");
        assert_eq!(cfg.debounce_ms(), 750);
    }

    #[test]
    fn test_theme_custom_colors() {
        let toml = r##"
[theme]
scheme = "custom"

[theme.custom]
terminal_bg = "#1a1b26"
border_fg = "#565f89"
"##;
        let cfg: AppConfig = toml::from_str(toml).expect("parse");
        assert_eq!(cfg.theme.scheme.as_deref(), Some("custom"));
        let custom = cfg.theme.custom.as_ref().expect("custom present");
        assert_eq!(custom.terminal_bg.as_deref(), Some("#1a1b26"));
        assert_eq!(custom.border_fg.as_deref(), Some("#565f89"));
        assert!(custom.status_bg.is_none());
    }
}
