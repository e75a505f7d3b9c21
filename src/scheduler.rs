use std::time::{Duration, Instant};

use crate::lesson::Page;

/// Work deferred until a deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    AdvanceQuestion,
}

#[derive(Debug, Clone)]
struct Pending {
    page: Page,
    due: Instant,
    task: TimerTask,
}

/// Delayed tasks tagged with the page that scheduled them, so leaving the
/// page can drop whatever it left behind.
#[derive(Debug, Default)]
pub struct DelayedTasks {
    pending: Vec<Pending>,
}

impl DelayedTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, page: Page, now: Instant, delay: Duration, task: TimerTask) {
        self.pending.push(Pending {
            page,
            due: now + delay,
            task,
        });
    }

    /// Drops every task scheduled by `page`; returns how many were dropped.
    pub fn cancel_page(&mut self, page: Page) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| p.page != page);
        before - self.pending.len()
    }

    /// Removes and returns tasks due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerTask> {
        let mut due: Vec<Pending> = Vec::new();
        self.pending.retain(|p| {
            if p.due <= now {
                due.push(p.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|p| p.due);
        due.into_iter().map(|p| p.task).collect()
    }

    /// Earliest deadline still pending.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Start/stop-able recurring tick at a fixed interval.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Returns false if already running; a second start never double-schedules.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_running() {
            return false;
        }
        self.next_due = Some(now + self.interval);
        true
    }

    /// Returns true only for the call that actually stopped the ticker.
    pub fn stop(&mut self) -> bool {
        self.next_due.take().is_some()
    }

    /// Consumes one due tick, if any. Call repeatedly to catch up.
    pub fn take_tick(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if due <= now => {
                self.next_due = Some(due + self.interval);
                true
            }
            _ => false,
        }
    }

    /// Drops ticks that are already overdue.
    pub fn skip_missed(&mut self, now: Instant) {
        if let Some(due) = self.next_due {
            if due <= now {
                self.next_due = Some(now + self.interval);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_task_fires_after_delay() {
        let t0 = Instant::now();
        let mut tasks = DelayedTasks::new();
        tasks.schedule(Page::Quiz, t0, 2000 * MS, TimerTask::AdvanceQuestion);

        assert!(tasks.take_due(t0 + 1999 * MS).is_empty());
        assert_eq!(
            tasks.take_due(t0 + 2000 * MS),
            vec![TimerTask::AdvanceQuestion]
        );
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_cancel_page_drops_only_that_page() {
        let t0 = Instant::now();
        let mut tasks = DelayedTasks::new();
        tasks.schedule(Page::Quiz, t0, MS, TimerTask::AdvanceQuestion);
        tasks.schedule(Page::Reader, t0, MS, TimerTask::AdvanceQuestion);

        assert_eq!(tasks.cancel_page(Page::Quiz), 1);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks.cancel_page(Page::Quiz), 0);
    }

    #[test]
    fn test_next_due_is_earliest() {
        let t0 = Instant::now();
        let mut tasks = DelayedTasks::new();
        assert_eq!(tasks.next_due(), None);

        tasks.schedule(Page::Quiz, t0, 300 * MS, TimerTask::AdvanceQuestion);
        tasks.schedule(Page::Quiz, t0, 100 * MS, TimerTask::AdvanceQuestion);
        assert_eq!(tasks.next_due(), Some(t0 + 100 * MS));

        tasks.take_due(t0 + 100 * MS);
        assert_eq!(tasks.next_due(), Some(t0 + 300 * MS));
    }

    #[test]
    fn test_ticker_start_is_idempotent() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(16 * MS);

        assert!(ticker.start(t0));
        assert!(!ticker.start(t0 + 5 * MS));

        assert!(!ticker.take_tick(t0 + 15 * MS));
        assert!(ticker.take_tick(t0 + 16 * MS));
        assert!(!ticker.take_tick(t0 + 16 * MS));
    }

    #[test]
    fn test_ticker_stops_once() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(16 * MS);
        ticker.start(t0);

        assert!(ticker.stop());
        assert!(!ticker.stop());
        assert!(!ticker.take_tick(t0 + 100 * MS));
    }

    #[test]
    fn test_ticker_catches_up() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(10 * MS);
        ticker.start(t0);

        let mut ticks = 0;
        while ticker.take_tick(t0 + 35 * MS) {
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[test]
    fn test_ticker_skip_missed() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(10 * MS);
        ticker.start(t0);

        ticker.skip_missed(t0 + 500 * MS);
        assert!(!ticker.take_tick(t0 + 505 * MS));
        assert!(ticker.take_tick(t0 + 510 * MS));
    }
}
