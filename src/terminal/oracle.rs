//! Cursor position oracle.
//!
//! Line-mode keystrokes are not applied as they arrive: each one waits in a
//! bounded FIFO until the surface has reported where the cursor really is.
//! Only one `ESC[6n` query is in flight at a time, so a report always
//! reflects every edit applied before it. A query that is not answered in
//! time releases its keystroke with an estimated position and opens a
//! quarantine window: inputs arriving during it are released immediately on
//! the estimate, and a report that shows up late is discarded instead of
//! being credited to a newer keystroke.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static CURSOR_REPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\x1b\[(\d+);(\d+)R$").expect("valid regex"));

/// How many timeouts' worth of time the quarantine lasts.
const QUARANTINE_FACTOR: u32 = 10;

/// 0-based cursor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub x: usize,
    pub y: usize,
}

/// Parse a `ESC[<row>;<col>R` report into a 0-based position.
pub fn parse_report(data: &str) -> Option<CursorPosition> {
    let caps = CURSOR_REPORT.captures(data)?;
    let row: usize = caps[1].parse().ok()?;
    let col: usize = caps[2].parse().ok()?;
    Some(CursorPosition {
        x: col.saturating_sub(1),
        y: row.saturating_sub(1),
    })
}

/// A keystroke waiting for its cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInput {
    pub seq: u64,
    pub data: String,
}

/// What a cursor report means given the oracle's state.
#[derive(Debug, PartialEq, Eq)]
pub enum Report {
    /// Answers the query in flight; apply this input at the reported spot.
    Answer(PendingInput),
    /// Answers a query that already timed out.
    Late,
    /// Nobody asked. In raw mode it belongs to the remote program.
    Unsolicited,
}

#[derive(Debug)]
struct InFlight {
    seq: u64,
    deadline: Instant,
}

#[derive(Debug)]
pub struct CursorOracle {
    queue: VecDeque<PendingInput>,
    capacity: usize,
    timeout: Duration,
    next_seq: u64,
    in_flight: Option<InFlight>,
    quarantine_until: Option<Instant>,
    late_reports: usize,
}

impl CursorOracle {
    pub fn new(timeout: Duration, capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
            timeout,
            next_seq: 0,
            in_flight: None,
            quarantine_until: None,
            late_reports: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn awaiting_report(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Queue a keystroke. Returns `false` (and drops it) when the queue is full.
    pub fn enqueue(&mut self, data: String) -> bool {
        if self.queue.len() >= self.capacity {
            warn!(
                pending = self.queue.len(),
                "cursor query queue full, dropping input"
            );
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back(PendingInput { seq, data });
        true
    }

    /// Whether inputs are being resolved from the estimate.
    pub fn quarantined(&mut self, now: Instant) -> bool {
        match self.quarantine_until {
            Some(until) if now < until => true,
            Some(_) => {
                debug!(dropped = self.late_reports, "cursor quarantine over");
                self.quarantine_until = None;
                self.late_reports = 0;
                false
            }
            None => false,
        }
    }

    /// Take the head input without a query. Only meaningful in quarantine.
    pub fn pop_estimated(&mut self) -> Option<PendingInput> {
        self.queue.pop_front()
    }

    /// Start a query for the head input if none is running. Returns `true`
    /// when the caller must write the query sequence.
    pub fn start_query(&mut self, now: Instant) -> bool {
        if self.in_flight.is_some() || self.quarantined(now) {
            return false;
        }
        let Some(head) = self.queue.front() else {
            return false;
        };
        self.in_flight = Some(InFlight {
            seq: head.seq,
            deadline: now + self.timeout,
        });
        true
    }

    pub fn on_report(&mut self) -> Report {
        if let Some(flight) = self.in_flight.take() {
            // The head is only popped by an answer or an expiry, so it is
            // still the queried input.
            return match self.queue.pop_front() {
                Some(input) => {
                    debug_assert_eq!(input.seq, flight.seq);
                    Report::Answer(input)
                }
                None => Report::Late,
            };
        }
        if self.late_reports > 0 {
            self.late_reports -= 1;
            return Report::Late;
        }
        Report::Unsolicited
    }

    /// Give up on an overdue query: its input is returned for estimated
    /// dispatch and quarantine begins.
    pub fn expire(&mut self, now: Instant) -> Option<PendingInput> {
        let flight = self.in_flight.as_ref()?;
        if now < flight.deadline {
            return None;
        }
        let seq = flight.seq;
        self.in_flight = None;
        self.late_reports += 1;
        self.quarantine_until = Some(now + self.timeout * QUARANTINE_FACTOR);
        warn!(seq, timeout_ms = self.timeout.as_millis() as u64, "cursor query timed out");
        self.queue.pop_front()
    }

    /// Abandon everything (connection reset).
    pub fn reset(&mut self) {
        self.queue.clear();
        self.in_flight = None;
        self.quarantine_until = None;
        self.late_reports = 0;
    }
}
