use crate::command::KeyCode;
use serde::Serialize;
use tracing::trace;

pub const DEFAULT_PRESS_TICKS: u16 = 6;

/// Single active-key latch. The host only ever reports one key at a time, so
/// there is no per-key matrix state here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LatchState {
    #[default]
    Idle,
    Candidate { code: KeyCode, ticks: u16 },
    Confirmed { code: KeyCode },
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    state: LatchState,
    press_threshold: u16,
    presses: u32,
    bounces: u32,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_PRESS_TICKS)
    }
}

impl Debouncer {
    pub fn new(press_threshold: u16) -> Self {
        Self {
            state: LatchState::Idle,
            press_threshold: press_threshold.max(1),
            presses: 0,
            bounces: 0,
        }
    }

    /// Feed one tick of the raw key signal. Returns the key exactly once per
    /// press, on the tick it has been stable for `press_threshold` ticks.
    pub fn sample(&mut self, raw: Option<KeyCode>) -> Option<KeyCode> {
        match (self.state, raw) {
            (LatchState::Idle, None) => None,
            (LatchState::Idle, Some(code)) => self.begin(code),
            (LatchState::Candidate { code, ticks }, Some(raw_code)) if raw_code == code => {
                let ticks = ticks.saturating_add(1);
                if ticks >= self.press_threshold {
                    self.confirm(code)
                } else {
                    self.state = LatchState::Candidate { code, ticks };
                    None
                }
            }
            (LatchState::Candidate { code, .. }, Some(raw_code)) => {
                trace!(from = %code, to = %raw_code, "key changed before settling");
                self.bounces = self.bounces.wrapping_add(1);
                self.begin(raw_code)
            }
            (LatchState::Candidate { code, ticks }, None) => {
                trace!(%code, ticks, "bounce suppressed");
                self.bounces = self.bounces.wrapping_add(1);
                self.state = LatchState::Idle;
                None
            }
            (LatchState::Confirmed { code }, Some(raw_code)) if raw_code == code => None,
            // A different key while one is held: release the old one first.
            (LatchState::Confirmed { .. }, Some(raw_code)) => self.begin(raw_code),
            (LatchState::Confirmed { .. }, None) => {
                self.state = LatchState::Idle;
                None
            }
        }
    }

    fn begin(&mut self, code: KeyCode) -> Option<KeyCode> {
        if self.press_threshold <= 1 {
            return self.confirm(code);
        }
        self.state = LatchState::Candidate { code, ticks: 1 };
        None
    }

    fn confirm(&mut self, code: KeyCode) -> Option<KeyCode> {
        self.state = LatchState::Confirmed { code };
        self.presses = self.presses.wrapping_add(1);
        Some(code)
    }

    pub fn reset(&mut self) {
        self.state = LatchState::Idle;
    }

    pub fn state(&self) -> LatchState {
        self.state
    }

    pub fn press_threshold(&self) -> u16 {
        self.press_threshold
    }

    pub fn presses(&self) -> u32 {
        self.presses
    }

    pub fn bounces(&self) -> u32 {
        self.bounces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_1: KeyCode = KeyCode::new(0x1B);
    const KEY_2: KeyCode = KeyCode::new(0x17);

    fn run(db: &mut Debouncer, raw: Option<KeyCode>, ticks: usize) -> usize {
        (0..ticks).filter(|_| db.sample(raw).is_some()).count()
    }

    #[test]
    fn press_confirms_on_threshold_tick() {
        let mut db = Debouncer::new(4);
        assert_eq!(db.sample(Some(KEY_1)), None);
        assert_eq!(db.sample(Some(KEY_1)), None);
        assert_eq!(db.sample(Some(KEY_1)), None);
        assert_eq!(db.sample(Some(KEY_1)), Some(KEY_1));
        assert_eq!(db.state(), LatchState::Confirmed { code: KEY_1 });
    }

    #[test]
    fn held_key_emits_once() {
        let mut db = Debouncer::new(6);
        assert_eq!(run(&mut db, Some(KEY_1), 10_000), 1);
        assert_eq!(db.presses(), 1);
    }

    #[test]
    fn release_rearms_for_next_press() {
        let mut db = Debouncer::new(3);
        assert_eq!(run(&mut db, Some(KEY_1), 20), 1);
        assert_eq!(run(&mut db, None, 1), 0);
        assert_eq!(db.state(), LatchState::Idle);
        assert_eq!(run(&mut db, Some(KEY_1), 20), 1);
        assert_eq!(db.presses(), 2);
    }

    #[test]
    fn short_glitches_are_dropped() {
        let mut db = Debouncer::new(5);
        for _ in 0..10 {
            assert_eq!(run(&mut db, Some(KEY_1), 4), 0);
            assert_eq!(run(&mut db, None, 1), 0);
        }
        assert_eq!(db.presses(), 0);
        assert_eq!(db.bounces(), 10);
    }

    #[test]
    fn changing_key_restarts_window() {
        let mut db = Debouncer::new(3);
        assert_eq!(run(&mut db, Some(KEY_1), 2), 0);
        assert_eq!(db.sample(Some(KEY_2)), None);
        assert_eq!(db.sample(Some(KEY_2)), None);
        assert_eq!(db.sample(Some(KEY_2)), Some(KEY_2));
    }

    #[test]
    fn rolling_to_another_key_counts_as_new_press() {
        let mut db = Debouncer::new(2);
        assert_eq!(run(&mut db, Some(KEY_1), 5), 1);
        assert_eq!(run(&mut db, Some(KEY_2), 5), 1);
        assert_eq!(db.state(), LatchState::Confirmed { code: KEY_2 });
    }

    #[test]
    fn threshold_of_one_confirms_immediately() {
        let mut db = Debouncer::new(0);
        assert_eq!(db.press_threshold(), 1);
        assert_eq!(db.sample(Some(KEY_1)), Some(KEY_1));
        assert_eq!(db.sample(Some(KEY_1)), None);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut db = Debouncer::new(2);
        run(&mut db, Some(KEY_1), 5);
        db.reset();
        assert_eq!(db.state(), LatchState::Idle);
        assert_eq!(run(&mut db, Some(KEY_1), 5), 1);
    }
}
