//! Terminal size negotiation.

/// Smallest grid the surface is ever given.
pub const MIN_COLS: u16 = 2;
pub const MIN_ROWS: u16 = 1;

/// Best-fit grid for a container `width` x `height` cells. `None` while the
/// container has no area (e.g. minimized or not laid out yet).
pub fn fit(width: u16, height: u16) -> Option<(u16, u16)> {
    if width == 0 || height == 0 {
        return None;
    }
    Some((width.max(MIN_COLS), height.max(MIN_ROWS)))
}

/// Remembers the last applied size so repeated observations are ignored.
#[derive(Debug, Default)]
pub struct ResizeNegotiator {
    last: Option<(u16, u16)>,
}

impl ResizeNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `(cols, rows)` differs from the last applied size.
    pub fn observe(&mut self, cols: u16, rows: u16) -> bool {
        if self.last == Some((cols, rows)) {
            return false;
        }
        self.last = Some((cols, rows));
        true
    }

    pub fn last(&self) -> Option<(u16, u16)> {
        self.last
    }
}
