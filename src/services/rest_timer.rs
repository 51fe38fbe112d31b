/// Countdown between sets. One per tracker, ticked once per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestTimer {
    pub remaining: u32,
    pub is_resting: bool,
}

impl RestTimer {
    pub fn start(seconds: u32) -> Self {
        Self {
            remaining: seconds,
            is_resting: seconds > 0,
        }
    }

    /// Advance by one second. Reaching zero ends the rest.
    pub fn tick(self) -> Self {
        if !self.is_resting {
            return self;
        }

        let remaining = self.remaining.saturating_sub(1);
        Self {
            remaining,
            is_resting: remaining > 0,
        }
    }
}
