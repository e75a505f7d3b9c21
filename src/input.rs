use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::physics::InputState;

/// Covers the pause most terminals leave before auto-repeat starts.
pub const REPEAT_DELAY: Duration = Duration::from_millis(550);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKey {
    Left,
    Right,
    Jump,
}

impl GameKey {
    /// Letter and arrow bindings per direction, plus space for jump.
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Left => Some(GameKey::Left),
            KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Right => Some(GameKey::Right),
            KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Char(' ') | KeyCode::Up => {
                Some(GameKey::Jump)
            }
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            GameKey::Left => 0,
            GameKey::Right => 1,
            GameKey::Jump => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Held {
    UntilRelease,
    Until(Instant),
}

/// Held-key state for the game.
///
/// Terminals only report key releases when keyboard enhancement is on. When
/// they don't, a fresh press counts as held until auto-repeat can kick in
/// (at least `REPEAT_DELAY`) and each repeat extends it by `hold`.
#[derive(Debug, Clone)]
pub struct KeyTracker {
    hold: Duration,
    reports_release: bool,
    held: [Option<Held>; 3],
}

impl KeyTracker {
    pub fn new(hold: Duration, reports_release: bool) -> Self {
        Self {
            hold,
            reports_release,
            held: [None; 3],
        }
    }

    pub fn press(&mut self, key: GameKey, now: Instant) {
        let held = if self.reports_release {
            Held::UntilRelease
        } else if self.is_held(key, now) {
            Held::Until(now + self.hold)
        } else {
            Held::Until(now + self.hold.max(REPEAT_DELAY))
        };
        self.held[key.slot()] = Some(held);
    }

    pub fn release(&mut self, key: GameKey) {
        self.held[key.slot()] = None;
    }

    /// Feeds a terminal key event; returns false if it is not a game key.
    pub fn on_key_event(&mut self, key: &KeyEvent, now: Instant) -> bool {
        let Some(game_key) = GameKey::from_key_code(key.code) else {
            return false;
        };
        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => self.press(game_key, now),
            KeyEventKind::Release => self.release(game_key),
        }
        true
    }

    pub fn is_held(&self, key: GameKey, now: Instant) -> bool {
        match self.held[key.slot()] {
            Some(Held::UntilRelease) => true,
            Some(Held::Until(deadline)) => now < deadline,
            None => false,
        }
    }

    pub fn snapshot(&self, now: Instant) -> InputState {
        InputState {
            left: self.is_held(GameKey::Left, now),
            right: self.is_held(GameKey::Right, now),
            jump: self.is_held(GameKey::Jump, now),
        }
    }

    pub fn clear(&mut self) {
        self.held = [None; 3];
    }
}
