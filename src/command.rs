//! Host command word decoding.
//!
//! Bit layout of the command word written by the host every tick:
//!
//! | bits   | meaning                                   |
//! |--------|-------------------------------------------|
//! | 31     | strobe (host is driving the port)         |
//! | 15     | FIFO pop request                          |
//! | 7      | key byte valid                            |
//! | 6..0   | key scan code                             |
//!
//! Everything else is reserved. `0x8000_0000` is the "off" word the host
//! writes between presses.

use serde::Serialize;
use std::fmt;

pub const CMD_STROBE: u32 = 1 << 31;
pub const CMD_POP: u32 = 1 << 15;
pub const CMD_KEY_VALID: u32 = 0x80;
pub const CMD_SCAN_MASK: u32 = 0x7F;
const CMD_RESERVED: u32 = !(CMD_STROBE | CMD_POP | 0xFF);

/// Matrix scan code of a key (`column * 4 + row + 1`), without the valid bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct KeyCode(u8);

impl KeyCode {
    pub const fn new(scan: u8) -> Self {
        Self(scan & CMD_SCAN_MASK as u8)
    }

    /// Key byte as it appears on the wire, valid bit included.
    pub const fn wire_byte(self) -> u8 {
        self.0 | CMD_KEY_VALID as u8
    }

    pub const fn scan(self) -> u8 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.wire_byte())
    }
}

/// One tick's worth of host request. Illegal combinations of the raw bits
/// collapse into one of these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    Idle,
    KeyDown(KeyCode),
    /// `key_held` is set when the same word also carries a valid key byte.
    Pop { key_held: bool },
}

impl Command {
    pub const POP: Command = Command::Pop { key_held: false };

    pub fn decode(word: u32) -> Self {
        if word & CMD_RESERVED != 0 {
            return Command::Idle;
        }
        let key = word & 0xFF;
        let key_valid = key & CMD_KEY_VALID != 0 && key & CMD_SCAN_MASK != 0;
        // Pop wins over a key byte in the same word.
        if word & CMD_POP != 0 {
            return Command::Pop {
                key_held: key_valid,
            };
        }
        if word & CMD_STROBE == 0 || !key_valid {
            return Command::Idle;
        }
        Command::KeyDown(KeyCode::new(key as u8))
    }

    /// Canonical word for this request, as the host test bench writes it.
    pub fn encode(self) -> u32 {
        match self {
            Command::Idle => CMD_STROBE,
            Command::KeyDown(code) => CMD_STROBE | code.wire_byte() as u32,
            Command::Pop { .. } => CMD_STROBE | CMD_POP,
        }
    }

    /// Raw key signal seen by the debouncer this tick.
    pub fn raw_key(self) -> Option<KeyCode> {
        match self {
            Command::KeyDown(code) => Some(code),
            _ => None,
        }
    }

    pub fn is_pop(self) -> bool {
        matches!(self, Command::Pop { .. })
    }

    /// The key latch holds its state through a pop word that also carries a
    /// key byte; the key is neither pressed nor released on that tick.
    pub fn freezes_latch(self) -> bool {
        matches!(self, Command::Pop { key_held: true })
    }
}
