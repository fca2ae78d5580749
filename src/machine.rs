//! The whole key/printer port as the host sees it.
//!
//! Keys go through the same push path as [`KeyPort`](crate::KeyPort); the
//! engine drains them at its own pace and its print lines drive the drum
//! printer. Every sector record lands in the print FIFO, and that FIFO is
//! what a host pop reads.
//!
//! Order within a tick: key push, engine, printer push, host pop. The engine
//! takes no keys while a line is printing.

use crate::command::Command;
use crate::config::MachineConfig;
use crate::engine::{Engine, ListingEngine};
use crate::fifo::{Fifo, PushOutcome};
use crate::keymap::MatrixRecord;
use crate::port::{KeyPipeline, KeyPortSnapshot};
use crate::printer::{DrumPrinter, PrintLine, PrinterSnapshot};
use crate::reset::ResetSequencer;
use crate::status::{ResultPort, StatusWord};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const PRINT_FIFO_DEPTH: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct MachineSnapshot {
    pub ticks: u64,
    pub in_reset: bool,
    pub keys: KeyPortSnapshot,
    pub print_fifo: Vec<MatrixRecord>,
    pub print_dropped: u32,
    pub printer: PrinterSnapshot,
    pub tape: Vec<String>,
}

pub struct Calculator<E: Engine = ListingEngine> {
    config: MachineConfig,
    keys: KeyPipeline,
    engine: E,
    engine_countdown: u32,
    printer: DrumPrinter,
    print_fifo: Fifo<MatrixRecord, PRINT_FIFO_DEPTH>,
    result: ResultPort,
    reset: ResetSequencer,
    ticks: u64,
}

impl Default for Calculator<ListingEngine> {
    fn default() -> Self {
        Self::new(MachineConfig::default(), ListingEngine::new())
    }
}

impl<E: Engine> Calculator<E> {
    pub fn new(config: MachineConfig, engine: E) -> Self {
        Self {
            keys: KeyPipeline::new(&config.port),
            engine,
            engine_countdown: config.engine_period,
            printer: DrumPrinter::new(config.sector_ticks),
            print_fifo: Fifo::new(config.print_overflow),
            result: ResultPort::new(),
            reset: ResetSequencer::new(config.port.min_reset_ticks),
            ticks: 0,
            config,
        }
    }

    pub fn tick(&mut self, command: u32) -> u32 {
        self.tick_with_reset(false, command)
    }

    pub fn tick_with_reset(&mut self, reset: bool, command: u32) -> u32 {
        self.ticks = self.ticks.wrapping_add(1);
        if self.reset.sample(reset) {
            if self.reset.entering() {
                info!(tick = self.ticks, "calculator reset");
            }
            self.clear();
            return self.result.word().raw();
        }

        let command = Command::decode(command);
        if !command.freezes_latch() {
            self.keys.sample(command.raw_key());
        }
        self.run_engine();
        if let Some(record) = self.printer.tick() {
            self.push_record(record);
        }
        self.result
            .service(command.is_pop(), &mut self.print_fifo)
            .raw()
    }

    pub fn reset_for(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick_with_reset(true, 0);
        }
    }

    fn clear(&mut self) {
        self.keys.reset();
        self.engine.reset();
        self.engine_countdown = self.config.engine_period;
        self.printer.reset();
        self.print_fifo.clear();
        self.result.reset();
    }

    /// The engine waits for the printer to finish the current line, so a
    /// backlog stays in the key FIFO where its overflow policy applies.
    fn run_engine(&mut self) {
        if self.printer.busy() {
            return;
        }
        self.engine_countdown = self.engine_countdown.saturating_sub(1);
        if self.engine_countdown > 0 {
            return;
        }
        self.engine_countdown = self.config.engine_period;
        let Some(event) = self.keys.fifo_mut().pop() else {
            return;
        };
        if let Some(line) = self.engine.key(event) {
            debug!(line = %line, "print requested");
            self.printer.submit(line);
        }
    }

    fn push_record(&mut self, record: MatrixRecord) {
        match self.print_fifo.push(record) {
            PushOutcome::Queued => {}
            PushOutcome::DroppedNewest(lost) => {
                debug!(row = lost.row, columns = lost.columns, "print FIFO full, record dropped");
                if self.print_fifo.dropped() == 1 {
                    warn!("print FIFO overflowed; later sector records are being dropped");
                }
            }
            PushOutcome::EvictedOldest(lost) => {
                debug!(row = lost.row, columns = lost.columns, "print FIFO full, oldest record evicted");
                if self.print_fifo.dropped() == 1 {
                    warn!("print FIFO overflowed; oldest sector records are being evicted");
                }
            }
        }
    }

    pub fn status(&self) -> StatusWord {
        self.result.word()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn tape(&self) -> &[PrintLine] {
        self.printer.tape()
    }

    pub fn pending_records(&self) -> usize {
        self.print_fifo.len()
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.fifo().len()
    }

    pub fn printer_busy(&self) -> bool {
        self.printer.busy()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        let keys = self
            .keys
            .snapshot(self.ticks, self.reset.in_reset(), &self.result);
        MachineSnapshot {
            ticks: self.ticks,
            in_reset: self.reset.in_reset(),
            keys,
            print_fifo: self.print_fifo.iter().copied().collect(),
            print_dropped: self.print_fifo.dropped(),
            printer: self.printer.snapshot(),
            tape: self
                .printer
                .tape()
                .iter()
                .map(|line| line.to_string().trim_start().to_string())
                .collect(),
        }
    }
}
