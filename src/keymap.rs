//! 141-PF keyboard matrix and the event encoder.
//!
//! The keyboard is scanned as 8 columns of 4 rows. A key's scan code is
//! `column * 4 + row + 1`; columns 8 and 9 of the scan chain carry the
//! decimal-point and rounding slide switches, which are level-sensed by the
//! program and never produce press events.

use crate::command::KeyCode;
use serde::Serialize;
use std::fmt;

pub const KEY_ROWS: u8 = 4;
pub const KEY_COLUMNS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Key {
    Digit(u8),
    DoubleZero,
    TripleZero,
    Point,
    Plus,
    Minus,
    Multiply,
    Divide,
    Equals,
    Sqrt,
    Percent,
    MemoryClear,
    MemoryRecall,
    MemoryMinus,
    MemoryPlus,
    MemoryEqualsMinus,
    MemoryEqualsPlus,
    Diamond,
    Diamond2,
    Sign,
    Exchange,
    ClearEntry,
    Clear,
}

// Column-major: index = scan code - 1.
const KEY_TABLE: [Key; (KEY_ROWS * KEY_COLUMNS) as usize] = [
    // column 0
    Key::MemoryClear,
    Key::MemoryRecall,
    Key::MemoryMinus,
    Key::MemoryPlus,
    // column 1
    Key::Sqrt,
    Key::Percent,
    Key::MemoryEqualsMinus,
    Key::MemoryEqualsPlus,
    // column 2
    Key::Diamond,
    Key::Divide,
    Key::Multiply,
    Key::Equals,
    // column 3
    Key::Minus,
    Key::Plus,
    Key::Diamond2,
    Key::TripleZero,
    // column 4
    Key::Digit(9),
    Key::Digit(6),
    Key::Digit(3),
    Key::Point,
    // column 5
    Key::Digit(8),
    Key::Digit(5),
    Key::Digit(2),
    Key::DoubleZero,
    // column 6
    Key::Digit(7),
    Key::Digit(4),
    Key::Digit(1),
    Key::Digit(0),
    // column 7
    Key::Sign,
    Key::Exchange,
    Key::ClearEntry,
    Key::Clear,
];

impl Key {
    pub fn from_code(code: KeyCode) -> Option<Self> {
        let index = code.scan().checked_sub(1)? as usize;
        KEY_TABLE.get(index).copied()
    }

    /// Scan code of this key. `None` for values with no keycap, such as
    /// `Digit(10)`.
    pub fn code(self) -> Option<KeyCode> {
        let index = KEY_TABLE.iter().position(|key| *key == self)?;
        Some(KeyCode::new(index as u8 + 1))
    }

    /// Parse a keycap label (`"7"`, `"000"`, `"+"`, `"CE"`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        KEY_TABLE.iter().copied().find(|key| key.label() == label)
    }

    pub fn label(self) -> &'static str {
        match self {
            Key::Digit(d) => ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"]
                .get(d as usize)
                .copied()
                .unwrap_or("?"),
            Key::DoubleZero => "00",
            Key::TripleZero => "000",
            Key::Point => ".",
            Key::Plus => "+",
            Key::Minus => "-",
            Key::Multiply => "x",
            Key::Divide => "/",
            Key::Equals => "=",
            Key::Sqrt => "SQRT",
            Key::Percent => "%",
            Key::MemoryClear => "CM",
            Key::MemoryRecall => "RM",
            Key::MemoryMinus => "M-",
            Key::MemoryPlus => "M+",
            Key::MemoryEqualsMinus => "M=-",
            Key::MemoryEqualsPlus => "M=+",
            Key::Diamond => "<>",
            Key::Diamond2 => "<>2",
            Key::Sign => "S",
            Key::Exchange => "EX",
            Key::ClearEntry => "CE",
            Key::Clear => "C",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A confirmed key press, located on the keyboard matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub row: u8,
    pub columns: u32,
}

impl KeyEvent {
    /// Encode a confirmed press. Codes with no key behind them yield `None`
    /// and must not be queued.
    pub fn encode(code: KeyCode) -> Option<Self> {
        Key::from_code(code)?;
        let index = code.scan() - 1;
        Some(Self {
            code,
            row: index % KEY_ROWS,
            columns: 1 << (index / KEY_ROWS),
        })
    }

    pub fn key(&self) -> Option<Key> {
        Key::from_code(self.code)
    }

    pub fn column(&self) -> u8 {
        self.columns.trailing_zeros() as u8
    }
}

/// Row plus column bit-mask: the payload of every valid result word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MatrixRecord {
    pub row: u8,
    pub columns: u32,
}

impl MatrixRecord {
    pub const fn new(row: u8, columns: u32) -> Self {
        Self { row, columns }
    }
}

impl From<KeyEvent> for MatrixRecord {
    fn from(event: KeyEvent) -> Self {
        Self {
            row: event.row,
            columns: event.columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_bench_codes_resolve_to_keys() {
        let cases = [
            (0x1B, Key::Digit(1)),
            (0x17, Key::Digit(2)),
            (0x13, Key::Digit(3)),
            (0x1A, Key::Digit(4)),
            (0x0E, Key::Plus),
            (0x0D, Key::Minus),
            (0x0C, Key::Equals),
        ];
        for (scan, key) in cases {
            assert_eq!(Key::from_code(KeyCode::new(scan)), Some(key), "scan {scan:#x}");
            assert_eq!(key.code(), Some(KeyCode::new(scan)));
        }
    }

    #[test]
    fn encoder_places_keys_on_matrix() {
        let one = Key::Digit(1).code().and_then(KeyEvent::encode).unwrap();
        assert_eq!((one.row, one.columns), (2, 1 << 6));
        let equals = Key::Equals.code().and_then(KeyEvent::encode).unwrap();
        assert_eq!((equals.row, equals.columns), (3, 1 << 2));
        let four = Key::Digit(4).code().and_then(KeyEvent::encode).unwrap();
        assert_eq!((four.row, four.column()), (1, 6));
        let clear = Key::Clear.code().and_then(KeyEvent::encode).unwrap();
        assert_eq!((clear.row, clear.column()), (3, 7));
    }

    #[test]
    fn every_key_has_single_column_bit() {
        for scan in 1..=32u8 {
            let event = KeyEvent::encode(KeyCode::new(scan)).unwrap();
            assert_eq!(event.columns.count_ones(), 1);
            assert!(event.row < KEY_ROWS);
            assert!(event.column() < KEY_COLUMNS);
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(KeyEvent::encode(KeyCode::new(0)), None);
        // Slide switch contacts.
        assert_eq!(KeyEvent::encode(KeyCode::new(33)), None);
        assert_eq!(KeyEvent::encode(KeyCode::new(40)), None);
        assert_eq!(KeyEvent::encode(KeyCode::new(0x7F)), None);
    }

    #[test]
    fn out_of_range_digit_has_no_code() {
        assert_eq!(Key::Digit(10).code(), None);
        assert_eq!(Key::Digit(255).code(), None);
        assert_eq!(Key::Digit(9).code(), Some(KeyCode::new(0x11)));
    }

    #[test]
    fn labels_round_trip() {
        for key in KEY_TABLE {
            assert_eq!(Key::from_label(key.label()), Some(key));
        }
        assert_eq!(Key::from_label("nope"), None);
    }
}
