use std::time::Duration;

use instant::Instant;

/// Floor for any tick period, so a zero-length frame can't spin the loop.
pub const MIN_PERIOD: Duration = Duration::from_millis(10);
/// Missed periods replayed after a late wake-up. Beyond this the backlog is
/// dropped and the ticker restarts from the wake-up time.
pub const MAX_CATCH_UP: u32 = 5;

/// Deadline-driven periodic tick, polled from the event loop.
///
/// Nothing runs on its own: the owner asks for `next_deadline()` to decide
/// how long to sleep, then drains due ticks with `poll()`. Each poll hands
/// out exactly one tick and moves the deadline forward by one period, so a
/// late wake-up replays every missed tick instead of merging them, up to
/// `MAX_CATCH_UP` periods behind. A longer stall (sleep, debugger) fires a
/// single tick at `now` and carries on from there. Once cancelled, polling
/// yields nothing until re-armed.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            next: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// First tick one period from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    /// Override the next deadline (used for per-frame cadence).
    pub fn schedule(&mut self, at: Instant) {
        self.next = Some(at);
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Take one due tick. Returns the deadline that fired.
    pub fn poll(&mut self, now: Instant) -> Option<Instant> {
        match self.next {
            Some(deadline) if deadline <= now => {
                let behind = now.duration_since(deadline);
                if behind > self.period * MAX_CATCH_UP {
                    log::debug!("Ticker {behind:?} behind, dropping the backlog");
                    self.next = Some(now + self.period);
                    return Some(now);
                }
                self.next = Some(deadline + self.period);
                Some(deadline)
            }
            _ => None,
        }
    }
}

/// Earlier of two optional deadlines.
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn unarmed_never_fires() {
        let mut t = Ticker::new(50 * MS);
        assert_eq!(t.poll(Instant::now() + 10 * 50 * MS), None);
    }

    #[test]
    fn late_wakeup_replays_each_tick() {
        let start = Instant::now();
        let mut t = Ticker::new(50 * MS);
        t.arm(start);

        let mut fired = Vec::new();
        while let Some(at) = t.poll(start + 175 * MS) {
            fired.push(at);
        }
        assert_eq!(fired, [start + 50 * MS, start + 100 * MS, start + 150 * MS]);
        assert_eq!(t.next_deadline(), Some(start + 200 * MS));
    }

    #[test]
    fn long_stall_drops_backlog() {
        let start = Instant::now();
        let mut t = Ticker::new(50 * MS);
        t.arm(start);

        let woke = start + Duration::from_secs(3600);
        assert_eq!(t.poll(woke), Some(woke));
        assert_eq!(t.poll(woke), None);
        assert_eq!(t.next_deadline(), Some(woke + 50 * MS));
    }

    #[test]
    fn catch_up_limit_is_inclusive() {
        let start = Instant::now();
        let mut t = Ticker::new(50 * MS);
        t.arm(start);

        // first deadline is exactly MAX_CATCH_UP periods behind
        let woke = start + 50 * MS * (MAX_CATCH_UP + 1);
        let mut fired = 0;
        while t.poll(woke).is_some() {
            fired += 1;
        }
        assert_eq!(fired, MAX_CATCH_UP + 1);
    }

    #[test]
    fn cancel_stops_polling() {
        let start = Instant::now();
        let mut t = Ticker::new(50 * MS);
        t.arm(start);
        t.cancel();
        assert!(!t.is_armed());
        assert_eq!(t.poll(start + 500 * MS), None);
    }

    #[test]
    fn zero_period_is_floored() {
        assert_eq!(Ticker::new(Duration::ZERO).period(), MIN_PERIOD);
    }

    #[test]
    fn earliest_picks_min() {
        let now = Instant::now();
        assert_eq!(earliest(Some(now + MS), Some(now)), Some(now));
        assert_eq!(earliest(None, Some(now)), Some(now));
        assert_eq!(earliest(None, None), None);
    }
}
