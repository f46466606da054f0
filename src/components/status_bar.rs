use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::app::ConnectionState;
use crate::theme::ThemeColors;

const KEY_HINTS: &str = " ^Q:quit  S-PgUp/PgDn:scroll ";

/// Status bar widget: connection state, shell identity, session flags and
/// key hints, or a transient status message.
pub struct StatusBarWidget<'a> {
    connection: ConnectionState,
    theme: &'a ThemeColors,
    identity: Option<&'a str>,
    ready: bool,
    raw_mode: bool,
    tree_count: Option<usize>,
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(connection: ConnectionState, theme: &'a ThemeColors) -> Self {
        Self {
            connection,
            theme,
            identity: None,
            ready: false,
            raw_mode: false,
            tree_count: None,
            status_message: None,
            is_error: false,
        }
    }

    /// `user@host cwd` of the remote shell.
    pub fn identity(mut self, identity: &'a str) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn raw_mode(mut self, raw_mode: bool) -> Self {
        self.raw_mode = raw_mode;
        self
    }

    /// Node count of the last `xoblas` listing.
    pub fn tree_count(mut self, count: Option<usize>) -> Self {
        self.tree_count = count;
        self
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;
        let base = Style::default()
            .bg(self.theme.status_bg)
            .fg(self.theme.status_fg);

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.error_fg)
                    .fg(self.theme.status_fg)
            } else {
                base.fg(self.theme.success_fg)
            };

            // Pad or truncate message to fill full width
            let display: String = msg.chars().take(width).collect();
            let display = format!("{:<width$}", display, width = width);

            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let (label, color) = match self.connection {
            ConnectionState::Connecting => ("connecting", self.theme.warning_fg),
            ConnectionState::Connected if self.ready => ("ready", self.theme.success_fg),
            ConnectionState::Connected => ("starting", self.theme.info_fg),
            ConnectionState::Disconnected => ("disconnected", self.theme.error_fg),
            ConnectionState::Failed => ("offline", self.theme.error_fg),
        };

        let mut spans = vec![Span::styled(
            format!(" {label} "),
            base.fg(color).add_modifier(Modifier::BOLD),
        )];

        if let Some(identity) = self.identity {
            spans.push(Span::styled(format!(" {identity} "), base));
        }

        if self.raw_mode {
            spans.push(Span::styled(
                " RAW ".to_string(),
                base.fg(self.theme.accent_fg).add_modifier(Modifier::BOLD),
            ));
        }

        if let Some(count) = self.tree_count {
            spans.push(Span::styled(
                format!(" tree:{count} "),
                base.fg(self.theme.info_fg),
            ));
        }

        // Pad to fill remaining width if needed, then add hints
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let hints = if used + KEY_HINTS.len() <= width {
            KEY_HINTS
        } else {
            ""
        };
        let pad = width.saturating_sub(used).saturating_sub(hints.len());
        if pad > 0 {
            spans.push(Span::styled(" ".repeat(pad), base));
        }
        spans.push(Span::styled(
            hints,
            base.fg(self.theme.dim_fg).add_modifier(Modifier::DIM),
        ));

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;
    use ratatui::style::Color;

    fn test_theme() -> ThemeColors {
        theme::dark_theme()
    }

    fn rendered(widget: StatusBarWidget<'_>, width: u16) -> (String, Buffer) {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        let content = (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect();
        (content, buf)
    }

    #[test]
    fn test_basic_widget_creation() {
        let tc = test_theme();
        let widget = StatusBarWidget::new(ConnectionState::Connecting, &tc);
        assert!(widget.identity.is_none());
        assert!(!widget.ready);
        assert!(widget.status_message.is_none());
    }

    #[test]
    fn test_ready_session() {
        let tc = test_theme();
        let widget = StatusBarWidget::new(ConnectionState::Connected, &tc)
            .ready(true)
            .identity("root@box /app")
            .tree_count(Some(7));
        let (content, buf) = rendered(widget, 100);
        assert!(content.contains("ready"));
        assert!(content.contains("root@box /app"));
        assert!(content.contains("tree:7"));
        assert!(content.contains("^Q:quit"));
        assert!(!content.contains("RAW"));
        assert_eq!(buf.cell((1, 0)).unwrap().fg, Color::Rgb(166, 227, 161));
    }

    #[test]
    fn test_connected_but_not_ready() {
        let tc = test_theme();
        let widget = StatusBarWidget::new(ConnectionState::Connected, &tc).raw_mode(true);
        let (content, _) = rendered(widget, 80);
        assert!(content.contains("starting"));
        assert!(content.contains("RAW"));
    }

    #[test]
    fn test_disconnected() {
        let tc = test_theme();
        let (content, buf) = rendered(StatusBarWidget::new(ConnectionState::Disconnected, &tc), 80);
        assert!(content.contains("disconnected"));
        assert_eq!(buf.cell((1, 0)).unwrap().fg, Color::Rgb(243, 139, 168));
    }

    #[test]
    fn test_status_message_error() {
        let tc = test_theme();
        let widget = StatusBarWidget::new(ConnectionState::Failed, &tc)
            .status_message("Connection refused", true);
        let (content, buf) = rendered(widget, 80);
        assert!(content.contains("Connection refused"));

        // Check error style: theme error background, theme status fg
        let cell = buf.cell((0, 0)).unwrap();
        assert_eq!(cell.bg, Color::Rgb(243, 139, 168));
        assert_eq!(cell.fg, Color::Rgb(205, 214, 244));
    }

    #[test]
    fn test_narrow_bar_drops_hints() {
        let tc = test_theme();
        let widget =
            StatusBarWidget::new(ConnectionState::Connected, &tc).identity("user@host ~");
        let (content, _) = rendered(widget, 30);
        assert!(content.contains("user@host"));
        assert!(!content.contains("^Q"));
    }

    #[test]
    fn test_zero_area_does_not_panic() {
        let tc = test_theme();
        let widget = StatusBarWidget::new(ConnectionState::Connecting, &tc);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
    }
}
