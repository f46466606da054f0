//! Terminal emulator: ANSI escape sequence parser + screen buffer.
//!
//! Uses the `vte` crate (from Alacritty) to parse ANSI sequences and
//! maintains a grid of cells that map to ratatui styled spans for rendering.
//! Device status queries are answered into a reply queue that the session
//! drains as if the user had typed them.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::terminal::ansi;
use crate::terminal::TerminalSurface;

/// A single character cell in the terminal grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub modifiers: Modifier,
}

impl Default for Cell {
    fn default() -> Self {
        Pen::default().blank()
    }
}

/// Current SGR attributes.
#[derive(Debug, Clone, Copy)]
struct Pen {
    fg: Color,
    bg: Color,
    modifiers: Modifier,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            fg: Color::Reset,
            bg: Color::Reset,
            modifiers: Modifier::empty(),
        }
    }
}

impl Pen {
    fn cell(&self, ch: char) -> Cell {
        Cell {
            ch,
            fg: self.fg,
            bg: self.bg,
            modifiers: self.modifiers,
        }
    }

    fn blank(&self) -> Cell {
        self.cell(' ')
    }
}

type Grid = Vec<Vec<Cell>>;

fn blank_grid(rows: usize, cols: usize) -> Grid {
    vec![vec![Cell::default(); cols]; rows]
}

/// Copy `old` into a `rows` x `cols` grid, dropping its first `skip` rows.
fn refit(old: &Grid, rows: usize, cols: usize, skip: usize) -> Grid {
    let mut grid = blank_grid(rows, cols);
    for (dst, src) in grid.iter_mut().zip(old.iter().skip(skip)) {
        for (cell, prev) in dst.iter_mut().zip(src.iter()) {
            *cell = prev.clone();
        }
    }
    grid
}

/// Parser-independent screen state; the vte performer.
#[derive(Debug)]
struct Screen {
    grid: Grid,
    /// Scrollback buffer (oldest lines first).
    scrollback: Vec<Vec<Cell>>,
    max_scrollback: usize,
    row: usize,
    /// May equal `cols` right after printing in the last column (pending wrap).
    col: usize,
    rows: usize,
    cols: usize,
    pen: Pen,
    /// Saved cursor position (for ESC 7 / ESC 8 and CSI s / u).
    saved_cursor: Option<(usize, usize)>,
    /// Main screen stashed while a full-screen program uses the alternate one.
    main_screen: Option<(Grid, usize, usize)>,
    cursor_visible: bool,
    /// Treat a bare line feed as CR LF.
    convert_eol: bool,
    replies: Vec<String>,
}

/// The terminal emulator with screen buffer and VTE parser.
pub struct TerminalEmulator {
    screen: Screen,
    parser: vte::Parser,
}

impl TerminalEmulator {
    /// Create a new terminal emulator with the given dimensions.
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            screen: Screen {
                grid: blank_grid(rows, cols),
                scrollback: Vec::new(),
                max_scrollback: 1000,
                row: 0,
                col: 0,
                rows,
                cols,
                pen: Pen::default(),
                saved_cursor: None,
                main_screen: None,
                cursor_visible: true,
                convert_eol: false,
                replies: Vec::new(),
            },
            parser: vte::Parser::new(),
        }
    }

    pub fn with_scrollback(mut self, lines: usize) -> Self {
        self.screen.max_scrollback = lines;
        self
    }

    pub fn with_convert_eol(mut self, convert: bool) -> Self {
        self.screen.convert_eol = convert;
        self
    }

    /// Feed raw bytes through the VTE parser.
    pub fn process(&mut self, data: &[u8]) {
        for &byte in data {
            self.parser.advance(&mut self.screen, byte);
        }
    }

    /// Resize the emulator grid, keeping whatever content still fits.
    pub fn set_size(&mut self, rows: usize, cols: usize) {
        let s = &mut self.screen;
        let rows = rows.max(1);
        let cols = cols.max(1);
        // Keep the rows nearest the cursor when shrinking vertically.
        let skip = (s.row + 1).saturating_sub(rows);
        let grid = refit(&s.grid, rows, cols, skip);
        if s.main_screen.is_none() {
            s.scrollback.extend(s.grid.drain(..skip));
            s.trim_scrollback();
        }
        if let Some((main, row, col)) = s.main_screen.as_mut() {
            let main_skip = (*row + 1).saturating_sub(rows);
            *main = refit(main, rows, cols, main_skip);
            *row -= main_skip;
            *col = (*col).min(cols - 1);
        }
        s.grid = grid;
        s.rows = rows;
        s.cols = cols;
        s.row = (s.row - skip).min(rows - 1);
        s.col = s.col.min(cols - 1);
    }

    /// Visible grid as ratatui lines, scrolled `offset` lines back into the
    /// scrollback.
    pub fn render_lines(&self, offset: usize) -> Vec<Line<'static>> {
        let s = &self.screen;
        let offset = offset.min(s.scrollback.len());
        let start = s.scrollback.len() - offset;
        s.scrollback[start..]
            .iter()
            .chain(s.grid.iter())
            .take(s.rows)
            .map(|row| row_to_line(row))
            .collect()
    }

    pub fn scrollback_len(&self) -> usize {
        self.screen.scrollback.len()
    }

    /// Cursor position (row, col), clamped to the grid.
    pub fn cursor_position(&self) -> (usize, usize) {
        let s = &self.screen;
        (s.row, s.col.min(s.cols - 1))
    }

    pub fn cursor_visible(&self) -> bool {
        self.screen.cursor_visible
    }

    pub fn in_alternate_screen(&self) -> bool {
        self.screen.main_screen.is_some()
    }
}

#[cfg(test)]
impl TerminalEmulator {
    pub fn visible_rows(&self) -> usize {
        self.screen.rows
    }

    pub fn visible_cols(&self) -> usize {
        self.screen.cols
    }

    /// Text of a visible row with trailing blanks removed.
    pub fn row_text(&self, row: usize) -> String {
        self.screen
            .grid
            .get(row)
            .map(|cells| cells.iter().map(|c| c.ch).collect::<String>())
            .unwrap_or_default()
            .trim_end()
            .to_string()
    }
}

impl TerminalSurface for TerminalEmulator {
    fn write(&mut self, data: &str) {
        self.process(data.as_bytes());
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.set_size(rows as usize, cols as usize);
    }

    fn cols(&self) -> u16 {
        self.screen.cols as u16
    }

    fn take_replies(&mut self) -> Vec<String> {
        std::mem::take(&mut self.screen.replies)
    }
}

fn row_to_line(row: &[Cell]) -> Line<'static> {
    let spans: Vec<Span<'static>> = row
        .iter()
        .map(|cell| {
            let style = Style::default()
                .fg(cell.fg)
                .bg(cell.bg)
                .add_modifier(cell.modifiers);
            Span::styled(cell.ch.to_string(), style)
        })
        .collect();
    Line::from(spans)
}

/// Numeric CSI parameter `idx`, where 0 or missing means `default`.
fn arg(params: &[u16], idx: usize, default: u16) -> usize {
    match params.get(idx).copied() {
        Some(0) | None => default as usize,
        Some(n) => n as usize,
    }
}

impl Screen {
    fn trim_scrollback(&mut self) {
        if self.scrollback.len() > self.max_scrollback {
            let excess = self.scrollback.len() - self.max_scrollback;
            self.scrollback.drain(..excess);
        }
    }

    /// Scroll the grid up by one line, moving the top line to scrollback.
    fn scroll_up(&mut self) {
        let line = self.grid.remove(0);
        if self.main_screen.is_none() {
            self.scrollback.push(line);
            self.trim_scrollback();
        }
        self.grid.push(vec![Cell::default(); self.cols]);
    }

    fn line_feed(&mut self) {
        if self.row + 1 >= self.rows {
            self.scroll_up();
        } else {
            self.row += 1;
        }
    }

    fn clear_cells(&mut self, row: usize, from: usize, to: usize) {
        let blank = self.pen.blank();
        if let Some(cells) = self.grid.get_mut(row) {
            let to = to.min(cells.len());
            for cell in cells.iter_mut().take(to).skip(from) {
                *cell = blank.clone();
            }
        }
    }

    fn clear_rows(&mut self, from: usize, to: usize) {
        for r in from..to.min(self.rows) {
            self.clear_cells(r, 0, self.cols);
        }
    }

    fn set_private_mode(&mut self, mode: u16, on: bool) {
        match mode {
            25 => self.cursor_visible = on,
            47 | 1047 | 1049 => {
                if on && self.main_screen.is_none() {
                    let main = std::mem::replace(&mut self.grid, blank_grid(self.rows, self.cols));
                    self.main_screen = Some((main, self.row, self.col));
                } else if !on {
                    if let Some((grid, row, col)) = self.main_screen.take() {
                        self.grid = refit(&grid, self.rows, self.cols, 0);
                        self.row = row.min(self.rows - 1);
                        self.col = col.min(self.cols - 1);
                    }
                }
            }
            _ => {}
        }
    }

    fn restore_cursor(&mut self) {
        if let Some((r, c)) = self.saved_cursor {
            self.row = r.min(self.rows - 1);
            self.col = c.min(self.cols - 1);
        }
    }

    fn report_status(&mut self, kind: usize) {
        match kind {
            5 => self.replies.push("\x1b[0n".to_string()),
            6 => {
                let col = self.col.min(self.cols - 1);
                self.replies.push(ansi::cursor_report(self.row + 1, col + 1));
            }
            _ => {}
        }
    }

    /// Handle SGR (Select Graphic Rendition) parameters.
    fn handle_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.pen = Pen::default();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let pen = &mut self.pen;
            match params[i] {
                0 => *pen = Pen::default(),
                1 => pen.modifiers |= Modifier::BOLD,
                2 => pen.modifiers |= Modifier::DIM,
                3 => pen.modifiers |= Modifier::ITALIC,
                4 => pen.modifiers |= Modifier::UNDERLINED,
                5 => pen.modifiers |= Modifier::SLOW_BLINK,
                7 => pen.modifiers |= Modifier::REVERSED,
                8 => pen.modifiers |= Modifier::HIDDEN,
                9 => pen.modifiers |= Modifier::CROSSED_OUT,
                21 | 22 => pen.modifiers -= Modifier::BOLD | Modifier::DIM,
                23 => pen.modifiers -= Modifier::ITALIC,
                24 => pen.modifiers -= Modifier::UNDERLINED,
                25 => pen.modifiers -= Modifier::SLOW_BLINK,
                27 => pen.modifiers -= Modifier::REVERSED,
                28 => pen.modifiers -= Modifier::HIDDEN,
                29 => pen.modifiers -= Modifier::CROSSED_OUT,
                n @ 30..=37 => pen.fg = base_color(n - 30),
                38 => {
                    if let Some((color, used)) = extended_color(&params[i + 1..]) {
                        pen.fg = color;
                        i += used;
                    }
                }
                39 => pen.fg = Color::Reset,
                n @ 40..=47 => pen.bg = base_color(n - 40),
                48 => {
                    if let Some((color, used)) = extended_color(&params[i + 1..]) {
                        pen.bg = color;
                        i += used;
                    }
                }
                49 => pen.bg = Color::Reset,
                n @ 90..=97 => pen.fg = bright_color(n - 90),
                n @ 100..=107 => pen.bg = bright_color(n - 100),
                _ => {}
            }
            i += 1;
        }
    }
}

fn base_color(n: u16) -> Color {
    match n {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        _ => Color::White,
    }
}

fn bright_color(n: u16) -> Color {
    match n {
        0 => Color::DarkGray,
        1 => Color::LightRed,
        2 => Color::LightGreen,
        3 => Color::LightYellow,
        4 => Color::LightBlue,
        5 => Color::LightMagenta,
        6 => Color::LightCyan,
        _ => Color::Gray,
    }
}

/// `5;N` (256-color) or `2;R;G;B` (truecolor) following a 38/48; returns
/// the color and how many parameters it consumed.
fn extended_color(rest: &[u16]) -> Option<(Color, usize)> {
    match rest {
        [5, n, ..] => Some((Color::Indexed(*n as u8), 2)),
        [2, r, g, b, ..] => Some((Color::Rgb(*r as u8, *g as u8, *b as u8), 4)),
        _ => None,
    }
}

impl vte::Perform for Screen {
    fn print(&mut self, c: char) {
        if self.col >= self.cols {
            self.col = 0;
            self.line_feed();
        }
        self.grid[self.row][self.col] = self.pen.cell(c);
        self.col += 1;
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\r' => self.col = 0,
            b'\n' | 0x0b | 0x0c => {
                if self.convert_eol {
                    self.col = 0;
                }
                self.line_feed();
            }
            0x08 => self.col = self.col.min(self.cols - 1).saturating_sub(1),
            b'\t' => {
                let tab_stop = (self.col + 8) & !7;
                self.col = tab_stop.min(self.cols - 1);
            }
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &vte::Params, intermediates: &[u8], _ignore: bool, action: char) {
        let p: Vec<u16> = params.iter().flat_map(|sub| sub.iter().copied()).collect();
        let private = intermediates.first() == Some(&b'?');
        let last_row = self.rows - 1;
        let last_col = self.cols - 1;

        match action {
            'A' => self.row = self.row.saturating_sub(arg(&p, 0, 1)),
            'B' => self.row = (self.row + arg(&p, 0, 1)).min(last_row),
            'C' => self.col = (self.col + arg(&p, 0, 1)).min(last_col),
            'D' => self.col = self.col.min(last_col).saturating_sub(arg(&p, 0, 1)),
            'E' => {
                self.row = (self.row + arg(&p, 0, 1)).min(last_row);
                self.col = 0;
            }
            'F' => {
                self.row = self.row.saturating_sub(arg(&p, 0, 1));
                self.col = 0;
            }
            'G' => self.col = (arg(&p, 0, 1) - 1).min(last_col),
            'd' => self.row = (arg(&p, 0, 1) - 1).min(last_row),
            'H' | 'f' => {
                self.row = (arg(&p, 0, 1) - 1).min(last_row);
                self.col = (arg(&p, 1, 1) - 1).min(last_col);
            }
            'J' => match p.first().copied().unwrap_or(0) {
                0 => {
                    self.clear_cells(self.row, self.col, self.cols);
                    self.clear_rows(self.row + 1, self.rows);
                }
                1 => {
                    self.clear_rows(0, self.row);
                    self.clear_cells(self.row, 0, self.col + 1);
                }
                2 | 3 => self.clear_rows(0, self.rows),
                _ => {}
            },
            'K' => match p.first().copied().unwrap_or(0) {
                0 => self.clear_cells(self.row, self.col, self.cols),
                1 => self.clear_cells(self.row, 0, self.col + 1),
                2 => self.clear_cells(self.row, 0, self.cols),
                _ => {}
            },
            'X' => {
                let n = arg(&p, 0, 1);
                self.clear_cells(self.row, self.col, self.col + n);
            }
            'P' => {
                let n = arg(&p, 0, 1);
                let blank = self.pen.blank();
                let (col, cols) = (self.col.min(last_col), self.cols);
                let line = &mut self.grid[self.row];
                let n = n.min(cols - col);
                line[col..].rotate_left(n);
                for cell in &mut line[cols - n..] {
                    *cell = blank.clone();
                }
            }
            '@' => {
                let n = arg(&p, 0, 1);
                let blank = self.pen.blank();
                let (col, cols) = (self.col.min(last_col), self.cols);
                let line = &mut self.grid[self.row];
                let n = n.min(cols - col);
                line[col..].rotate_right(n);
                for cell in &mut line[col..col + n] {
                    *cell = blank.clone();
                }
            }
            'L' => {
                for _ in 0..arg(&p, 0, 1).min(self.rows - self.row) {
                    self.grid.pop();
                    self.grid.insert(self.row, vec![Cell::default(); self.cols]);
                }
            }
            'M' => {
                for _ in 0..arg(&p, 0, 1).min(self.rows - self.row) {
                    self.grid.remove(self.row);
                    self.grid.push(vec![Cell::default(); self.cols]);
                }
            }
            'S' => {
                for _ in 0..arg(&p, 0, 1) {
                    self.scroll_up();
                }
            }
            'm' => self.handle_sgr(&p),
            'n' if !private => self.report_status(arg(&p, 0, 0)),
            'h' | 'l' if private => {
                for mode in &p {
                    self.set_private_mode(*mode, action == 'h');
                }
            }
            's' => self.saved_cursor = Some((self.row, self.col)),
            'u' => self.restore_cursor(),
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, byte: u8) {
        match byte {
            b'7' => self.saved_cursor = Some((self.row, self.col)),
            b'8' => self.restore_cursor(),
            b'c' => {
                self.pen = Pen::default();
                self.row = 0;
                self.col = 0;
                self.clear_rows(0, self.rows);
            }
            b'D' => self.line_feed(),
            b'M' => {
                if self.row == 0 {
                    self.grid.pop();
                    self.grid.insert(0, vec![Cell::default(); self.cols]);
                } else {
                    self.row -= 1;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_emulator() {
        let emu = TerminalEmulator::new(24, 80);
        assert_eq!(emu.visible_rows(), 24);
        assert_eq!(emu.visible_cols(), 80);
        assert_eq!(emu.cursor_position(), (0, 0));
    }

    #[test]
    fn test_print_and_newline() {
        let mut emu = TerminalEmulator::new(24, 80);
        emu.process(b"Line1\r\nLine2");
        assert_eq!(emu.row_text(0), "Line1");
        assert_eq!(emu.row_text(1), "Line2");
        assert_eq!(emu.cursor_position(), (1, 5));
    }

    #[test]
    fn test_bare_line_feed() {
        let mut emu = TerminalEmulator::new(24, 80);
        emu.process(b"ab\ncd");
        assert_eq!(emu.row_text(1), "  cd");

        let mut emu = TerminalEmulator::new(24, 80).with_convert_eol(true);
        emu.process(b"ab\ncd");
        assert_eq!(emu.row_text(1), "cd");
    }

    #[test]
    fn test_cursor_report() {
        let mut emu = TerminalEmulator::new(24, 80);
        emu.process(b"\x1b[6;11H\x1b[6n");
        assert_eq!(emu.take_replies(), vec!["\x1b[6;11R".to_string()]);
        assert!(emu.take_replies().is_empty());
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut emu = TerminalEmulator::new(24, 80);
        emu.process(b"$ \x1b[sabc\x1b[u");
        assert_eq!(emu.cursor_position(), (0, 2));
    }

    #[test]
    fn test_erase_line() {
        let mut emu = TerminalEmulator::new(24, 80);
        emu.process(b"Hello World\r\x1b[2K");
        assert_eq!(emu.row_text(0), "");
        emu.process(b"abcdef\x1b[3D\x1b[K");
        assert_eq!(emu.row_text(0), "abc");
    }

    #[test]
    fn test_sgr_colors() {
        let mut emu = TerminalEmulator::new(24, 80);
        emu.process(b"\x1b[31mR\x1b[0m\x1b[38;5;196mX\x1b[38;2;255;128;0mY");
        let cells = &emu.screen.grid[0];
        assert_eq!(cells[0].fg, Color::Red);
        assert_eq!(cells[1].fg, Color::Indexed(196));
        assert_eq!(cells[2].fg, Color::Rgb(255, 128, 0));
    }

    #[test]
    fn test_scrollback_and_offset() {
        let mut emu = TerminalEmulator::new(3, 10);
        emu.process(b"Line1\r\nLine2\r\nLine3\r\nLine4\r\nLine5");
        assert_eq!(emu.scrollback_len(), 2);
        let top = |lines: &[Line]| lines[0].spans.iter().map(|s| s.content.as_ref()).collect::<String>();
        assert!(top(&emu.render_lines(0)).starts_with("Line3"));
        assert!(top(&emu.render_lines(2)).starts_with("Line1"));
        assert!(top(&emu.render_lines(99)).starts_with("Line1"));
    }

    #[test]
    fn test_resize_keeps_cursor_row() {
        let mut emu = TerminalEmulator::new(4, 20);
        emu.process(b"a\r\nb\r\nc\r\nd");
        emu.set_size(2, 10);
        assert_eq!(emu.visible_cols(), 10);
        assert_eq!(emu.row_text(0), "c");
        assert_eq!(emu.row_text(1), "d");
        assert_eq!(emu.cursor_position(), (1, 1));
    }

    #[test]
    fn test_alternate_screen() {
        let mut emu = TerminalEmulator::new(5, 20);
        emu.process(b"$ vim");
        emu.process(b"\x1b[?1049h\x1b[?25l\x1b[H~ editor");
        assert!(emu.in_alternate_screen());
        assert!(!emu.cursor_visible());
        assert_eq!(emu.row_text(0), "~ editor");
        emu.process(b"\x1b[?1049l\x1b[?25h");
        assert!(!emu.in_alternate_screen());
        assert_eq!(emu.row_text(0), "$ vim");
        assert_eq!(emu.cursor_position(), (0, 5));
    }

    #[test]
    fn test_insert_and_delete_chars() {
        let mut emu = TerminalEmulator::new(2, 10);
        emu.process(b"abcdef\x1b[4G\x1b[2P");
        assert_eq!(emu.row_text(0), "abcf");
        emu.process(b"\x1b[2G\x1b[1@");
        assert_eq!(emu.row_text(0), "a bcf");
    }

    #[test]
    fn test_tab_and_backspace() {
        let mut emu = TerminalEmulator::new(24, 80);
        emu.process(b"\tX");
        assert_eq!(emu.screen.grid[0][8].ch, 'X');
        emu.process(b"\rAB\x08C");
        assert_eq!(emu.row_text(0), "AC      X");
    }

    #[test]
    fn test_wrap_at_last_column() {
        let mut emu = TerminalEmulator::new(3, 4);
        emu.process(b"abcd");
        assert_eq!(emu.cursor_position(), (0, 3));
        emu.process(b"e");
        assert_eq!(emu.row_text(1), "e");
    }
}
