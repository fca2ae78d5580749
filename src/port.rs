//! The key port: command decode, debounce, encode and the key FIFO, plus the
//! result word the host reads back.
//!
//! Per tick the push path runs before the pop path.

use crate::command::{Command, KeyCode};
use crate::config::PortConfig;
use crate::debounce::{Debouncer, LatchState};
use crate::fifo::{Fifo, PushOutcome};
use crate::keymap::KeyEvent;
use crate::reset::ResetSequencer;
use crate::status::{ResultPort, StatusWord};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const KEY_FIFO_DEPTH: usize = 8;

/// Push path shared by [`KeyPort`] and [`crate::Calculator`].
#[derive(Debug, Clone)]
pub struct KeyPipeline {
    debouncer: Debouncer,
    fifo: Fifo<KeyEvent, KEY_FIFO_DEPTH>,
    unknown_codes: u32,
}

impl KeyPipeline {
    pub fn new(config: &PortConfig) -> Self {
        Self {
            debouncer: Debouncer::new(config.press_threshold),
            fifo: Fifo::new(config.key_overflow),
            unknown_codes: 0,
        }
    }

    /// Run one tick of the raw key signal through debounce and encode.
    /// Returns the push outcome when a press was confirmed and encoded.
    pub fn sample(&mut self, raw: Option<KeyCode>) -> Option<PushOutcome<KeyEvent>> {
        let code = self.debouncer.sample(raw)?;
        let Some(event) = KeyEvent::encode(code) else {
            debug!(%code, "dropping press with no key behind it");
            self.unknown_codes = self.unknown_codes.wrapping_add(1);
            return None;
        };
        let outcome = self.fifo.push(event);
        match outcome {
            PushOutcome::Queued => {
                debug!(%code, row = event.row, columns = event.columns, "key queued");
            }
            PushOutcome::DroppedNewest(_) => {
                warn!(%code, "key FIFO full, press dropped");
            }
            PushOutcome::EvictedOldest(old) => {
                warn!(%code, evicted = %old.code, "key FIFO full, oldest press evicted");
            }
        }
        Some(outcome)
    }

    pub fn reset(&mut self) {
        self.debouncer.reset();
        self.fifo.clear();
    }

    pub fn fifo(&self) -> &Fifo<KeyEvent, KEY_FIFO_DEPTH> {
        &self.fifo
    }

    pub fn fifo_mut(&mut self) -> &mut Fifo<KeyEvent, KEY_FIFO_DEPTH> {
        &mut self.fifo
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn unknown_codes(&self) -> u32 {
        self.unknown_codes
    }

    pub fn snapshot(&self, ticks: u64, in_reset: bool, result: &ResultPort) -> KeyPortSnapshot {
        KeyPortSnapshot {
            ticks,
            in_reset,
            latch: self.debouncer.state(),
            press_threshold: self.debouncer.press_threshold(),
            fifo: self.fifo.iter().copied().collect(),
            fifo_len: self.fifo.len(),
            head: self.fifo.head_index(),
            tail: self.fifo.tail_index(),
            dropped: self.fifo.dropped(),
            unknown_codes: self.unknown_codes,
            presses: self.debouncer.presses(),
            bounces: self.debouncer.bounces(),
            status_word: result.word(),
            pops: result.pops(),
            empty_pops: result.empty_pops(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyPortSnapshot {
    pub ticks: u64,
    pub in_reset: bool,
    pub latch: LatchState,
    pub press_threshold: u16,
    pub fifo: Vec<KeyEvent>,
    pub fifo_len: usize,
    pub head: usize,
    pub tail: usize,
    pub dropped: u32,
    pub unknown_codes: u32,
    pub presses: u32,
    pub bounces: u32,
    pub status_word: StatusWord,
    pub pops: u32,
    pub empty_pops: u32,
}

#[derive(Debug, Clone)]
pub struct KeyPort {
    pipeline: KeyPipeline,
    result: ResultPort,
    reset: ResetSequencer,
    ticks: u64,
}

impl Default for KeyPort {
    fn default() -> Self {
        Self::new(PortConfig::default())
    }
}

impl KeyPort {
    pub fn new(config: PortConfig) -> Self {
        Self {
            pipeline: KeyPipeline::new(&config),
            result: ResultPort::new(),
            reset: ResetSequencer::new(config.min_reset_ticks),
            ticks: 0,
        }
    }

    pub fn tick(&mut self, command: u32) -> u32 {
        self.tick_with_reset(false, command)
    }

    pub fn tick_with_reset(&mut self, reset: bool, command: u32) -> u32 {
        self.ticks = self.ticks.wrapping_add(1);
        if self.reset.sample(reset) {
            if self.reset.entering() {
                info!(tick = self.ticks, "key port reset");
            }
            self.pipeline.reset();
            self.result.reset();
            return self.result.word().raw();
        }

        let command = Command::decode(command);
        if !command.freezes_latch() {
            self.pipeline.sample(command.raw_key());
        }
        self.result
            .service(command.is_pop(), self.pipeline.fifo_mut())
            .raw()
    }

    /// Hold reset for `ticks` ticks and release it.
    pub fn reset_for(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick_with_reset(true, 0);
        }
    }

    /// Take the oldest key event directly, bypassing the result word. This is
    /// the path the calculator core uses to drain keys.
    pub fn take_event(&mut self) -> Option<KeyEvent> {
        self.pipeline.fifo_mut().pop()
    }

    pub fn status(&self) -> StatusWord {
        self.result.word()
    }

    pub fn pending(&self) -> usize {
        self.pipeline.fifo().len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn snapshot(&self) -> KeyPortSnapshot {
        self.pipeline
            .snapshot(self.ticks, self.reset.in_reset(), &self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Key;

    fn press(port: &mut KeyPort, key: Key, hold: usize) {
        let word = Command::KeyDown(key.code().unwrap()).encode();
        for _ in 0..hold {
            port.tick(word);
        }
        port.tick(Command::Idle.encode());
    }

    #[test]
    fn debounced_press_reaches_fifo() {
        let mut port = KeyPort::default();
        press(&mut port, Key::Digit(7), 3);
        assert_eq!(port.pending(), 0, "too short to count");
        press(&mut port, Key::Digit(7), 20);
        assert_eq!(port.pending(), 1);
        let snap = port.snapshot();
        assert_eq!(snap.presses, 1);
        assert_eq!(snap.bounces, 1);
    }

    #[test]
    fn pop_with_key_bits_ignores_the_key() {
        let config = PortConfig {
            press_threshold: 1,
            ..PortConfig::default()
        };
        let mut port = KeyPort::new(config);
        assert_eq!(port.tick(0x8000_809B), 0);
        assert_eq!(port.pending(), 0);
        port.tick(Command::Idle.encode());

        port.tick(Command::KeyDown(Key::Digit(1).code().unwrap()).encode());
        let word = StatusWord::from_raw(port.tick(Command::POP.encode()));
        assert!(word.is_valid());
        assert_eq!((word.row(), word.columns()), (2, 1 << 6));
    }

    #[test]
    fn unknown_code_is_not_queued() {
        let mut port = KeyPort::default();
        for _ in 0..20 {
            port.tick(0x8000_00A5);
        }
        assert_eq!(port.pending(), 0);
        assert_eq!(port.snapshot().unknown_codes, 1);
    }

    #[test]
    fn short_reset_is_stretched() {
        let mut port = KeyPort::default();
        press(&mut port, Key::Plus, 10);
        port.tick_with_reset(true, 0);
        assert_eq!(port.pending(), 0);
        // Presses during the stretch are ignored.
        press(&mut port, Key::Minus, 10);
        assert!(port.snapshot().in_reset);
        assert_eq!(port.pending(), 0);
        for _ in 0..20 {
            port.tick(0);
        }
        press(&mut port, Key::Minus, 10);
        assert_eq!(port.pending(), 1);
    }

    #[test]
    fn take_event_drains_without_touching_status() {
        let mut port = KeyPort::default();
        press(&mut port, Key::Equals, 10);
        let event = port.take_event().unwrap();
        assert_eq!(event.key(), Some(Key::Equals));
        assert_eq!(port.status(), StatusWord::EMPTY);
    }
}
