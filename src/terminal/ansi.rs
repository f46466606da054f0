//! Terminal control sequences written by the session, in one place.

pub const CURSOR_LEFT: &str = "\x1b[D";
pub const CURSOR_RIGHT: &str = "\x1b[C";
pub const SAVE_CURSOR: &str = "\x1b[s";
/// Carriage return, then erase to end of line.
pub const CLEAR_LINE: &str = "\r\x1b[K";
/// Erase from the cursor to the end of the line.
pub const ERASE_TO_END: &str = "\x1b[K";
/// Device status report: ask for the cursor position.
pub const QUERY_CURSOR: &str = "\x1b[6n";
pub const CRLF: &str = "\r\n";

pub const GREEN: &str = "\x1b[32m";
pub const BLUE: &str = "\x1b[34m";
pub const RESET: &str = "\x1b[0m";

/// Move the cursor `n` columns left. Empty for `n == 0`.
pub fn move_left(n: usize) -> String {
    match n {
        0 => String::new(),
        1 => CURSOR_LEFT.to_string(),
        n => format!("\x1b[{n}D"),
    }
}

/// Move the cursor `n` columns right. Empty for `n == 0`.
pub fn move_right(n: usize) -> String {
    match n {
        0 => String::new(),
        1 => CURSOR_RIGHT.to_string(),
        n => format!("\x1b[{n}C"),
    }
}

/// Cursor position report as a terminal answers [`QUERY_CURSOR`] (1-based).
pub fn cursor_report(row: usize, col: usize) -> String {
    format!("\x1b[{row};{col}R")
}

/// Number of printable characters in `text`, ignoring escape sequences.
pub fn visible_len(text: &str) -> usize {
    let mut counter = PrintCounter(0);
    let mut parser = vte::Parser::new();
    for byte in text.bytes() {
        parser.advance(&mut counter, byte);
    }
    counter.0
}

struct PrintCounter(usize);

impl vte::Perform for PrintCounter {
    fn print(&mut self, _c: char) {
        self.0 += 1;
    }
}
