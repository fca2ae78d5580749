//! Drum printer model.
//!
//! The drum carries 13 sectors. Every sector passing the hammers produces
//! one record: the sector number as the row and the mask of hammers fired as
//! the columns. Column 0 is the mark column, column 1 the operator symbol
//! column, columns 2..=16 hold digits with the units digit in column 2.
//!
//! The drum parks at sector 11. A print cycle spins it through sectors 11
//! and 12, then one full revolution from the index sector 0; hammers are
//! only armed once the index has been seen.

use crate::keymap::MatrixRecord;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

pub const DRUM_SECTORS: u8 = 13;
pub const INDEX_SECTOR: u8 = 0;
pub const HOME_SECTOR: u8 = 11;
pub const DIGIT_COLUMNS: usize = 15;
pub const MARK_COLUMN: u32 = 0;
pub const SYMBOL_COLUMN: u32 = 1;
pub const FIRST_DIGIT_COLUMN: u32 = 2;
pub const DEFAULT_SECTOR_TICKS: u32 = 1024;
/// Printed lines kept on the tape; older lines scroll off.
pub const TAPE_LINES: usize = 256;

const CYCLE_SECTORS: u8 = DRUM_SECTORS + (DRUM_SECTORS - HOME_SECTOR);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Symbol {
    Plus,
    Minus,
}

impl Symbol {
    pub fn sector(self) -> u8 {
        match self {
            Symbol::Plus => 1,
            Symbol::Minus => 2,
        }
    }

    fn glyph(self) -> char {
        match self {
            Symbol::Plus => '+',
            Symbol::Minus => '-',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mark {
    Total,
}

impl Mark {
    pub fn sector(self) -> u8 {
        match self {
            Mark::Total => 1,
        }
    }

    fn glyph(self) -> char {
        match self {
            Mark::Total => '*',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PrintLine {
    /// Units digit first.
    digits: [Option<u8>; DIGIT_COLUMNS],
    symbol: Option<Symbol>,
    mark: Option<Mark>,
}

impl PrintLine {
    /// A right-aligned number without leading zeroes. Digits beyond the
    /// printer width are cut off at the top.
    pub fn number(value: u64) -> Self {
        let mut digits = [None; DIGIT_COLUMNS];
        let mut rest = value;
        for slot in digits.iter_mut() {
            *slot = Some((rest % 10) as u8);
            rest /= 10;
            if rest == 0 {
                break;
            }
        }
        Self {
            digits,
            symbol: None,
            mark: None,
        }
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.mark = Some(mark);
        self
    }

    /// Hammer mask for the given drum sector.
    pub fn hammers(&self, sector: u8) -> u32 {
        let mut mask = 0;
        for (offset, digit) in self.digits.iter().enumerate() {
            if *digit == Some(sector) {
                mask |= 1 << (FIRST_DIGIT_COLUMN + offset as u32);
            }
        }
        if self.symbol.map(Symbol::sector) == Some(sector) {
            mask |= 1 << SYMBOL_COLUMN;
        }
        if self.mark.map(Mark::sector) == Some(sector) {
            mask |= 1 << MARK_COLUMN;
        }
        mask
    }
}

impl fmt::Display for PrintLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in self.digits.iter().rev() {
            match digit {
                Some(d) => write!(f, "{d}")?,
                None => f.write_str(" ")?,
            }
        }
        write!(
            f,
            "{}{}",
            self.symbol.map(Symbol::glyph).unwrap_or(' '),
            self.mark.map(Mark::glyph).unwrap_or(' ')
        )
    }
}

#[derive(Debug, Clone)]
struct PrintCycle {
    line: PrintLine,
    sector: u8,
    armed: bool,
    remaining: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrinterSnapshot {
    pub busy: bool,
    pub sector: Option<u8>,
    pub spooled: usize,
    pub tape_lines: u32,
}

#[derive(Debug, Clone)]
pub struct DrumPrinter {
    spool: VecDeque<PrintLine>,
    cycle: Option<PrintCycle>,
    sector_ticks: u32,
    countdown: u32,
    tape: Vec<PrintLine>,
}

impl Default for DrumPrinter {
    fn default() -> Self {
        Self::new(DEFAULT_SECTOR_TICKS)
    }
}

impl DrumPrinter {
    pub fn new(sector_ticks: u32) -> Self {
        Self {
            spool: VecDeque::new(),
            cycle: None,
            sector_ticks: sector_ticks.max(1),
            countdown: 0,
            tape: Vec::new(),
        }
    }

    /// Queue a line; lines print in submission order.
    pub fn submit(&mut self, line: PrintLine) {
        self.spool.push_back(line);
    }

    /// Advance one tick. Returns a sector record when a sector passes the
    /// hammers on this tick.
    pub fn tick(&mut self) -> Option<MatrixRecord> {
        if self.cycle.is_none() {
            let line = self.spool.pop_front()?;
            debug!(line = %line, "print cycle started");
            self.cycle = Some(PrintCycle {
                line,
                sector: HOME_SECTOR,
                armed: false,
                remaining: CYCLE_SECTORS,
            });
            self.countdown = self.sector_ticks;
        }

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return None;
        }
        self.countdown = self.sector_ticks;

        let cycle = self.cycle.as_mut()?;
        let columns = if cycle.armed {
            cycle.line.hammers(cycle.sector)
        } else {
            0
        };
        let record = MatrixRecord::new(cycle.sector, columns);
        cycle.sector = (cycle.sector + 1) % DRUM_SECTORS;
        if cycle.sector == INDEX_SECTOR {
            cycle.armed = true;
        }
        cycle.remaining -= 1;
        if cycle.remaining == 0 {
            let line = cycle.line;
            self.cycle = None;
            if self.tape.len() == TAPE_LINES {
                self.tape.remove(0);
            }
            self.tape.push(line);
        }
        Some(record)
    }

    pub fn reset(&mut self) {
        self.spool.clear();
        self.cycle = None;
        self.countdown = 0;
        self.tape.clear();
    }

    pub fn busy(&self) -> bool {
        self.cycle.is_some() || !self.spool.is_empty()
    }

    /// Lines fully printed since the last reset, oldest first.
    pub fn tape(&self) -> &[PrintLine] {
        &self.tape
    }

    pub fn snapshot(&self) -> PrinterSnapshot {
        PrinterSnapshot {
            busy: self.busy(),
            sector: self.cycle.as_ref().map(|cycle| cycle.sector),
            spooled: self.spool.len(),
            tape_lines: self.tape.len() as u32,
        }
    }
}
