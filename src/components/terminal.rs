//! Terminal panel widget for rendering the remote shell's emulator grid.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Widget};

use crate::terminal::emulator::TerminalEmulator;
use crate::theme::ThemeColors;

/// Widget that renders the terminal emulator output.
pub struct TerminalWidget<'a> {
    emulator: &'a TerminalEmulator,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
    /// Lines scrolled back into history; 0 shows the live screen.
    scroll_offset: usize,
    show_cursor: bool,
}

impl<'a> TerminalWidget<'a> {
    pub fn new(emulator: &'a TerminalEmulator, theme: &'a ThemeColors, show_cursor: bool) -> Self {
        Self {
            emulator,
            theme,
            block: None,
            scroll_offset: 0,
            show_cursor,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn scroll_offset(mut self, offset: usize) -> Self {
        self.scroll_offset = offset;
        self
    }

    fn themed(&self, style: Style) -> Style {
        let mut style = style;
        if matches!(style.fg, None | Some(Color::Reset)) {
            style.fg = Some(self.theme.terminal_fg);
        }
        if matches!(style.bg, None | Some(Color::Reset)) {
            style.bg = Some(self.theme.terminal_bg);
        }
        style
    }
}

impl<'a> Widget for TerminalWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Render block border if present
        let inner = if let Some(ref block) = self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        // Full-screen programs have no history of their own.
        let offset = if self.emulator.in_alternate_screen() {
            0
        } else {
            self.scroll_offset.min(self.emulator.scrollback_len())
        };
        let lines = self.emulator.render_lines(offset);

        for (row_idx, line) in lines.iter().enumerate() {
            if row_idx >= inner.height as usize {
                break;
            }
            let y = inner.y + row_idx as u16;

            for (col_idx, span) in line.spans.iter().enumerate() {
                if col_idx >= inner.width as usize {
                    break;
                }
                let x = inner.x + col_idx as u16;
                buf.set_string(x, y, &span.content, self.themed(span.style));
            }
        }

        if offset > 0 {
            let marker = format!("[+{offset}]");
            let x = inner.x + inner.width.saturating_sub(marker.len() as u16);
            let style = Style::default()
                .fg(self.theme.dim_fg)
                .add_modifier(Modifier::DIM);
            buf.set_string(x, inner.y, marker, style);
        }

        if self.show_cursor && self.emulator.cursor_visible() {
            let (cursor_row, cursor_col) = self.emulator.cursor_position();
            let cursor_y = inner.y as usize + cursor_row + offset;
            let cursor_x = inner.x as usize + cursor_col;
            if cursor_x < (inner.x + inner.width) as usize
                && cursor_y < (inner.y + inner.height) as usize
            {
                // Invert the cell at cursor position
                if let Some(cell) = buf.cell_mut((cursor_x as u16, cursor_y as u16)) {
                    cell.set_style(
                        Style::default()
                            .fg(self.theme.cursor_fg)
                            .bg(self.theme.cursor_bg)
                            .add_modifier(Modifier::BOLD),
                    );
                }
            }
        }
    }
}
