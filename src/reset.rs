pub const DEFAULT_MIN_RESET_TICKS: u32 = 16;

/// Tracks the reset input. A pulse shorter than `min_ticks` is stretched so
/// the port always spends at least `min_ticks` ticks in reset.
#[derive(Debug, Clone)]
pub struct ResetSequencer {
    min_ticks: u32,
    held: u32,
    stretch: u32,
}

impl Default for ResetSequencer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_RESET_TICKS)
    }
}

impl ResetSequencer {
    pub fn new(min_ticks: u32) -> Self {
        Self {
            min_ticks,
            held: 0,
            stretch: 0,
        }
    }

    /// Sample the reset input for one tick; returns whether the port is in
    /// reset during this tick.
    pub fn sample(&mut self, asserted: bool) -> bool {
        if asserted {
            self.held = self.held.saturating_add(1);
            self.stretch = self.min_ticks.saturating_sub(self.held);
            return true;
        }
        self.held = 0;
        if self.stretch > 0 {
            self.stretch -= 1;
            return true;
        }
        false
    }

    /// True on the first tick of an external reset pulse.
    pub fn entering(&self) -> bool {
        self.held == 1
    }

    pub fn in_reset(&self) -> bool {
        self.held > 0 || self.stretch > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_pulse_is_not_stretched() {
        let mut reset = ResetSequencer::new(4);
        for _ in 0..10 {
            assert!(reset.sample(true));
        }
        assert!(!reset.sample(false));
        assert!(!reset.in_reset());
    }

    #[test]
    fn short_pulse_is_stretched_to_minimum() {
        let mut reset = ResetSequencer::new(5);
        assert!(reset.sample(true));
        assert!(reset.entering());
        assert!(reset.sample(true));
        assert!(!reset.entering());
        // Two ticks held, three more stretched.
        assert!(reset.sample(false));
        assert!(reset.sample(false));
        assert!(reset.sample(false));
        assert!(!reset.sample(false));
    }

    #[test]
    fn idle_input_never_resets() {
        let mut reset = ResetSequencer::default();
        assert!((0..100).all(|_| !reset.sample(false)));
    }
}
