//! Host command scripts.
//!
//! One step per line, `#` starts a comment:
//!
//! ```text
//! reset 100          # hold reset for 100 ticks
//! cmd 0x8000009b     # latch a command word (no tick)
//! wait 50000         # run ticks with the latched command
//! expect 0x80002c01  # compare the last result word
//! key +              # same as `cmd` with the key word for the `+` keycap
//! ```
//!
//! Numbers are decimal or `0x` hex, `_` separators allowed.

use crate::command::Command;
use crate::engine::Engine;
use crate::keymap::Key;
use crate::machine::Calculator;
use crate::port::KeyPort;
use crate::status::StatusWord;
use crate::{CoreError, Result};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStep {
    Reset(u32),
    Command(u32),
    Wait(u64),
    Expect(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceScript {
    steps: Vec<(usize, TraceStep)>,
}

fn parse_number(token: &str) -> Option<u64> {
    let cleaned = token.replace('_', "");
    match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => cleaned.parse().ok(),
    }
}

impl FromStr for TraceScript {
    type Err = CoreError;

    fn from_str(text: &str) -> Result<Self> {
        let mut steps = Vec::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let op = tokens.next().unwrap_or_default().to_ascii_lowercase();
            let arg = tokens.next().ok_or_else(|| {
                CoreError::InvalidTrace(format!("line {line_no}: '{op}' needs an argument"))
            })?;
            if let Some(extra) = tokens.next() {
                return Err(CoreError::InvalidTrace(format!(
                    "line {line_no}: unexpected '{extra}'"
                )));
            }
            let value = || {
                parse_number(arg).ok_or_else(|| {
                    CoreError::InvalidTrace(format!("line {line_no}: bad number '{arg}'"))
                })
            };
            let word = || {
                u32::try_from(value()?).map_err(|_| {
                    CoreError::InvalidTrace(format!("line {line_no}: '{arg}' exceeds 32 bits"))
                })
            };
            let step = match op.as_str() {
                "reset" => TraceStep::Reset(word()?),
                "cmd" => TraceStep::Command(word()?),
                "key" => {
                    let code = Key::from_label(arg).and_then(Key::code).ok_or_else(|| {
                        CoreError::InvalidTrace(format!("line {line_no}: no key labelled '{arg}'"))
                    })?;
                    TraceStep::Command(Command::KeyDown(code).encode())
                }
                "wait" => TraceStep::Wait(value()?),
                "expect" => TraceStep::Expect(word()?),
                other => {
                    return Err(CoreError::InvalidTrace(format!(
                        "line {line_no}: unknown step '{other}'"
                    )))
                }
            };
            steps.push((line_no, step));
        }
        Ok(Self { steps })
    }
}

/// Anything the host can clock with a reset line and a command word.
pub trait PortTarget {
    fn tick_with_reset(&mut self, reset: bool, command: u32) -> u32;
}

impl PortTarget for KeyPort {
    fn tick_with_reset(&mut self, reset: bool, command: u32) -> u32 {
        KeyPort::tick_with_reset(self, reset, command)
    }
}

impl<E: Engine> PortTarget for Calculator<E> {
    fn tick_with_reset(&mut self, reset: bool, command: u32) -> u32 {
        Calculator::tick_with_reset(self, reset, command)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Check {
    pub line: usize,
    pub tick: u64,
    pub expected: StatusWord,
    pub actual: StatusWord,
}

impl Check {
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceReport {
    pub ticks: u64,
    pub checks: Vec<Check>,
}

impl TraceReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(Check::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> + '_ {
        self.checks.iter().filter(|check| !check.passed())
    }
}

impl TraceScript {
    pub fn steps(&self) -> impl Iterator<Item = TraceStep> + '_ {
        self.steps.iter().map(|(_, step)| *step)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the script. The latched command stays applied through waits and
    /// reset pulses; the result word starts out empty.
    pub fn run<T: PortTarget + ?Sized>(&self, target: &mut T) -> TraceReport {
        let mut report = TraceReport::default();
        let mut command = 0u32;
        let mut last = StatusWord::EMPTY;
        for (line, step) in &self.steps {
            match *step {
                TraceStep::Reset(ticks) => {
                    for _ in 0..ticks {
                        last = StatusWord::from_raw(target.tick_with_reset(true, command));
                        report.ticks += 1;
                    }
                }
                TraceStep::Command(word) => command = word,
                TraceStep::Wait(ticks) => {
                    for _ in 0..ticks {
                        last = StatusWord::from_raw(target.tick_with_reset(false, command));
                        report.ticks += 1;
                    }
                }
                TraceStep::Expect(word) => {
                    let check = Check {
                        line: *line,
                        tick: report.ticks,
                        expected: StatusWord::from_raw(word),
                        actual: last,
                    };
                    if check.passed() {
                        debug!(line, word = %last, "expect ok");
                    } else {
                        warn!(line, expected = %check.expected, actual = %last, "expect mismatch");
                    }
                    report.checks.push(check);
                }
            }
        }
        report
    }
}
