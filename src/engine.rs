//! The calculator side that drains the key FIFO.
//!
//! The real machine runs the 141-PF program on the 4-bit CPU; here the
//! [`Engine`] trait is the seam and [`ListingEngine`] is a small adding
//! machine listing good enough to drive the printer.

use crate::keymap::{Key, KeyEvent};
use crate::printer::{Mark, PrintLine, Symbol, DIGIT_COLUMNS};
use tracing::debug;

pub trait Engine {
    /// Consume one key event; may ask for a line to be printed.
    fn key(&mut self, event: KeyEvent) -> Option<PrintLine>;

    fn reset(&mut self);
}

/// Adding listing: `+`/`-` print the entry with its operator and
/// accumulate it, `=` prints the total and starts over.
#[derive(Debug, Clone, Default)]
pub struct ListingEngine {
    entry: u64,
    entry_digits: usize,
    total: i64,
}

impl ListingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self) -> u64 {
        self.entry
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    fn push_digit(&mut self, digit: u8) {
        // Leading zeroes do not take up a column.
        if self.entry_digits >= DIGIT_COLUMNS {
            return;
        }
        self.entry = self.entry * 10 + u64::from(digit);
        if self.entry != 0 {
            self.entry_digits += 1;
        }
    }

    fn take_entry(&mut self) -> u64 {
        self.entry_digits = 0;
        std::mem::take(&mut self.entry)
    }

    fn accumulate(&mut self, symbol: Symbol) -> PrintLine {
        let entry = self.take_entry();
        let signed = i64::try_from(entry).unwrap_or(i64::MAX);
        self.total = match symbol {
            Symbol::Plus => self.total.saturating_add(signed),
            Symbol::Minus => self.total.saturating_sub(signed),
        };
        PrintLine::number(entry).with_symbol(symbol)
    }
}

impl Engine for ListingEngine {
    fn key(&mut self, event: KeyEvent) -> Option<PrintLine> {
        let key = event.key()?;
        debug!(%key, "engine key");
        match key {
            Key::Digit(digit) => self.push_digit(digit),
            Key::DoubleZero => (0..2).for_each(|_| self.push_digit(0)),
            Key::TripleZero => (0..3).for_each(|_| self.push_digit(0)),
            Key::Plus => return Some(self.accumulate(Symbol::Plus)),
            Key::Minus => return Some(self.accumulate(Symbol::Minus)),
            Key::Equals => {
                let total = std::mem::take(&mut self.total);
                self.take_entry();
                let mut line = PrintLine::number(total.unsigned_abs()).with_mark(Mark::Total);
                if total < 0 {
                    line = line.with_symbol(Symbol::Minus);
                }
                return Some(line);
            }
            Key::ClearEntry => {
                self.take_entry();
            }
            Key::Clear => {
                self.take_entry();
                self.total = 0;
            }
            _ => {}
        }
        None
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(engine: &mut ListingEngine, keys: &[Key]) -> Vec<String> {
        keys.iter()
            .filter_map(|key| key.code())
            .filter_map(KeyEvent::encode)
            .filter_map(|event| engine.key(event))
            .map(|line| line.to_string().trim().to_string())
            .collect()
    }

    #[test]
    fn adding_listing_prints_entries_and_total() {
        let mut engine = ListingEngine::new();
        let lines = feed(
            &mut engine,
            &[
                Key::Digit(1),
                Key::Digit(2),
                Key::Plus,
                Key::Digit(3),
                Key::Digit(4),
                Key::Plus,
                Key::Equals,
            ],
        );
        assert_eq!(lines, vec!["12+", "34+", "46 *"]);
        assert_eq!(engine.total(), 0);
    }

    #[test]
    fn negative_total_prints_minus_symbol() {
        let mut engine = ListingEngine::new();
        let lines = feed(
            &mut engine,
            &[Key::Digit(5), Key::Minus, Key::Digit(9), Key::Minus, Key::Equals],
        );
        assert_eq!(lines, vec!["5-", "9-", "14-*"]);
    }

    #[test]
    fn zero_keys_and_clear_entry() {
        let mut engine = ListingEngine::new();
        let lines = feed(
            &mut engine,
            &[
                Key::Digit(4),
                Key::ClearEntry,
                Key::Digit(2),
                Key::TripleZero,
                Key::DoubleZero,
                Key::Plus,
            ],
        );
        assert_eq!(lines, vec!["200000+"]);
        assert_eq!(engine.total(), 200_000);
        feed(&mut engine, &[Key::Clear]);
        assert_eq!(engine.total(), 0);
    }

    #[test]
    fn entry_is_capped_at_printer_width() {
        let mut engine = ListingEngine::new();
        let digits = vec![Key::Digit(9); 20];
        feed(&mut engine, &digits);
        assert_eq!(engine.entry(), 999_999_999_999_999);
    }

    #[test]
    fn unmapped_keys_print_nothing() {
        let mut engine = ListingEngine::new();
        assert!(feed(&mut engine, &[Key::Sqrt, Key::Percent, Key::Point]).is_empty());
    }
}
