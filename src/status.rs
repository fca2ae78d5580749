//! Result word packing and the pop side of the host port.
//!
//! | bits    | meaning                         |
//! |---------|---------------------------------|
//! | 31      | valid (word holds a popped record) |
//! | 30..14  | column mask, 17 bits            |
//! | 13..10  | row                             |
//! | 9..1    | zero                            |
//! | 0       | trailer marker, set when valid  |
//!
//! An empty pop reads back as all zeroes.

use crate::fifo::Fifo;
use crate::keymap::MatrixRecord;
use serde::Serialize;
use std::fmt;

pub const STATUS_VALID: u32 = 1 << 31;
pub const STATUS_MARKER: u32 = 1;
pub const STATUS_ROW_SHIFT: u32 = 10;
pub const STATUS_ROW_MASK: u32 = 0x0F;
pub const STATUS_COLUMN_SHIFT: u32 = 14;
pub const STATUS_COLUMN_MASK: u32 = 0x1_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct StatusWord(u32);

impl StatusWord {
    pub const EMPTY: StatusWord = StatusWord(0);

    pub fn from_record(record: MatrixRecord) -> Self {
        Self(
            STATUS_VALID
                | ((record.columns & STATUS_COLUMN_MASK) << STATUS_COLUMN_SHIFT)
                | ((record.row as u32 & STATUS_ROW_MASK) << STATUS_ROW_SHIFT)
                | STATUS_MARKER,
        )
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 & STATUS_VALID != 0
    }

    pub fn row(self) -> u8 {
        ((self.0 >> STATUS_ROW_SHIFT) & STATUS_ROW_MASK) as u8
    }

    pub fn columns(self) -> u32 {
        (self.0 >> STATUS_COLUMN_SHIFT) & STATUS_COLUMN_MASK
    }

    pub fn record(self) -> Option<MatrixRecord> {
        self.is_valid()
            .then(|| MatrixRecord::new(self.row(), self.columns()))
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Pop side of the port: pops once per rising edge of the pop request and
/// holds the last word in between.
#[derive(Debug, Clone, Default)]
pub struct ResultPort {
    word: StatusWord,
    pop_level: bool,
    pops: u32,
    empty_pops: u32,
}

impl ResultPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service<T, const N: usize>(
        &mut self,
        pop_request: bool,
        fifo: &mut Fifo<T, N>,
    ) -> StatusWord
    where
        T: Copy + Default + Into<MatrixRecord>,
    {
        let rising = pop_request && !self.pop_level;
        self.pop_level = pop_request;
        if rising {
            self.word = match fifo.pop() {
                Some(item) => {
                    self.pops = self.pops.wrapping_add(1);
                    StatusWord::from_record(item.into())
                }
                None => {
                    self.empty_pops = self.empty_pops.wrapping_add(1);
                    StatusWord::EMPTY
                }
            };
        }
        self.word
    }

    pub fn word(&self) -> StatusWord {
        self.word
    }

    pub fn pops(&self) -> u32 {
        self.pops
    }

    pub fn empty_pops(&self) -> u32 {
        self.empty_pops
    }

    pub fn reset(&mut self) {
        self.word = StatusWord::EMPTY;
        self.pop_level = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_observed_result_words() {
        let cases = [
            (MatrixRecord::new(11, 0), 0x8000_2c01),
            (MatrixRecord::new(12, 0), 0x8000_3001),
            (MatrixRecord::new(0, 0), 0x8000_0001),
            (MatrixRecord::new(1, 0b1010), 0x8002_8401),
            (MatrixRecord::new(2, 0b0100), 0x8001_0801),
            (MatrixRecord::new(5, 0), 0x8000_1401),
        ];
        for (record, raw) in cases {
            let word = StatusWord::from_record(record);
            assert_eq!(word.raw(), raw, "{record:?}");
            assert_eq!(word.record(), Some(record));
        }
    }

    #[test]
    fn empty_word_is_not_valid() {
        assert!(!StatusWord::EMPTY.is_valid());
        assert_eq!(StatusWord::EMPTY.record(), None);
        assert_eq!(StatusWord::EMPTY.to_string(), "0x00000000");
    }

    #[test]
    fn pops_only_on_rising_edge() {
        let mut fifo: Fifo<MatrixRecord, 4> = Fifo::default();
        fifo.push(MatrixRecord::new(1, 1));
        fifo.push(MatrixRecord::new(2, 2));
        let mut port = ResultPort::new();

        let first = port.service(true, &mut fifo);
        assert_eq!(first.row(), 1);
        for _ in 0..100 {
            assert_eq!(port.service(true, &mut fifo), first);
        }
        assert_eq!(fifo.len(), 1);

        assert_eq!(port.service(false, &mut fifo), first);
        assert_eq!(port.service(true, &mut fifo).row(), 2);
        assert_eq!(port.pops(), 2);
    }

    #[test]
    fn empty_pop_yields_empty_word_every_time() {
        let mut fifo: Fifo<MatrixRecord, 4> = Fifo::default();
        fifo.push(MatrixRecord::new(3, 1));
        let mut port = ResultPort::new();
        assert!(port.service(true, &mut fifo).is_valid());
        for _ in 0..5 {
            port.service(false, &mut fifo);
            assert_eq!(port.service(true, &mut fifo), StatusWord::EMPTY);
            assert_eq!(fifo.len(), 0);
        }
        assert_eq!(port.empty_pops(), 5);
    }
}
