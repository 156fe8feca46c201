use std::time::{Duration, Instant};

/// Rate limiter for data-path warnings. A hot UDP port can produce
/// thousands of bad datagrams a second; the log gets one line per interval
/// plus a count of what it suppressed.
pub(crate) struct Throttle {
    interval: Duration,
    last: Option<Instant>,
    suppressed: u64,
}

impl Throttle {
    pub(crate) fn per_second() -> Self {
        Self {
            interval: Duration::from_secs(1),
            last: None,
            suppressed: 0,
        }
    }

    /// `Some(suppressed)` when the caller may log now, carrying how many
    /// events were swallowed since the last line; `None` to stay quiet.
    pub(crate) fn allow(&mut self) -> Option<u64> {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last = Some(now);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }
}
