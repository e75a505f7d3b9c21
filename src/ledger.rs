/// Lives earned by finishing a book's quiz.
pub const QUIZ_REWARD: u32 = 2;

/// Lives lost each time the actor falls off the course.
pub const FALL_PENALTY: u32 = 1;

/// Result of taking lives away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debit {
    Remaining(u32),
    /// No lives left. Also reported when debiting an already empty ledger.
    Depleted,
}

/// Lives counter with a floor of zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivesLedger {
    lives: u32,
}

impl LivesLedger {
    pub fn new(lives: u32) -> Self {
        Self { lives }
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn credit(&mut self, amount: u32) -> u32 {
        self.lives = self.lives.saturating_add(amount);
        self.lives
    }

    pub fn debit(&mut self, amount: u32) -> Debit {
        self.lives = self.lives.saturating_sub(amount);
        match self.lives {
            0 => Debit::Depleted,
            n => Debit::Remaining(n),
        }
    }
}
