//! Terminal input plumbing. The runner blocks until input arrives or the
//! app's next deadline passes, so pages with nothing scheduled stay asleep.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEvent};
use tracing::warn;

/// Longest the runner sleeps when nothing is scheduled.
pub const IDLE_WAIT: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    /// No input before the deadline or the idle wait ran out.
    Wake,
    /// The input source hung up.
    Closed,
}

pub trait AppEventSource: Send + 'static {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(Event::Key(key)) => AppEvent::Key(key),
                Ok(Event::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(err) => {
                    warn!(%err, "terminal input stopped");
                    break;
                }
            };
            if tx.send(ev).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl AppEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed source for driving the app without a terminal.
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl AppEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How long to block before `deadline`, never longer than `idle`.
pub fn wait_until(deadline: Option<Instant>, now: Instant, idle: Duration) -> Duration {
    match deadline {
        Some(due) => due.saturating_duration_since(now).min(idle),
        None => idle,
    }
}

pub struct Runner<E: AppEventSource> {
    events: E,
    idle: Duration,
}

impl<E: AppEventSource> Runner<E> {
    pub fn new(events: E) -> Self {
        Self::with_idle(events, IDLE_WAIT)
    }

    pub fn with_idle(events: E, idle: Duration) -> Self {
        Self { events, idle }
    }

    /// Next input, or `Wake` once `deadline` has passed.
    pub fn step(&self, deadline: Option<Instant>, now: Instant) -> AppEvent {
        match self.events.recv_timeout(wait_until(deadline, now, self.idle)) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => AppEvent::Wake,
            Err(RecvTimeoutError::Disconnected) => AppEvent::Closed,
        }
    }
}
