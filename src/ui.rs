use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    widgets::{Block, Borders},
    Frame,
};

use crate::app::App;
use crate::components::status_bar::StatusBarWidget;
use crate::components::terminal::TerminalWidget;

/// Rows taken by the status bar.
const STATUS_HEIGHT: u16 = 1;
/// Columns and rows taken by the terminal panel border.
const BORDER: u16 = 2;

/// Terminal grid size (cols, rows) for a screen `width` x `height`.
pub fn terminal_area_size(width: u16, height: u16) -> (u16, u16) {
    (
        width.saturating_sub(BORDER),
        height.saturating_sub(BORDER + STATUS_HEIGHT),
    )
}

fn split(area: Rect) -> (Rect, Rect) {
    let [terminal, status] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(STATUS_HEIGHT)]).areas(area);
    (terminal, status)
}

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let (terminal_area, status_area) = split(frame.area());

    let block = Block::default()
        .title(" xoblas ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.border_focused_fg))
        .style(Style::default().bg(app.theme.terminal_bg));

    let terminal = TerminalWidget::new(app.session.surface(), &app.theme, app.scroll_offset == 0)
        .scroll_offset(app.scroll_offset)
        .block(block);
    frame.render_widget(terminal, terminal_area);

    let identity = app.identity_label();
    let mut status = StatusBarWidget::new(app.connection, &app.theme)
        .ready(app.session.is_ready())
        .raw_mode(app.session.raw_mode())
        .tree_count(app.tree_count);
    if let Some(ref identity) = identity {
        status = status.identity(identity);
    }
    if let Some((ref msg, is_error, _)) = app.status_message {
        status = status.status_message(msg, is_error);
    }
    frame.render_widget(status, status_area);
}
