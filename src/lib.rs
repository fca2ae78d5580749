//! Key acquisition and event FIFO core for a 141-PF style MCS-4 calculator.
//!
//! The host drives a 32-bit command word every clock tick (key strobe, key
//! byte, FIFO pop) and reads back a 32-bit result word. [`KeyPort`] is the
//! bare key subsystem: debounced key presses go into a FIFO and a pop request
//! returns the oldest one as a packed [`StatusWord`]. [`Calculator`] wires the
//! same push path into an [`Engine`] and a drum printer model, and the host
//! pop reads the printer sector FIFO instead.

use thiserror::Error;

pub mod command;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod fifo;
pub mod keymap;
pub mod machine;
pub mod port;
pub mod printer;
pub mod reset;
pub mod status;
pub mod trace;

pub use command::{Command, KeyCode};
pub use config::{MachineConfig, PortConfig};
pub use debounce::{Debouncer, LatchState};
pub use engine::{Engine, ListingEngine};
pub use fifo::{Fifo, OverflowPolicy, PushOutcome};
pub use keymap::{Key, KeyEvent, MatrixRecord};
pub use machine::{Calculator, MachineSnapshot, PRINT_FIFO_DEPTH};
pub use port::{KeyPipeline, KeyPort, KeyPortSnapshot, KEY_FIFO_DEPTH};
pub use printer::{DrumPrinter, Mark, PrintLine, Symbol};
pub use status::{ResultPort, StatusWord};
pub use trace::{PortTarget, TraceReport, TraceScript, TraceStep};

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid trace: {0}")]
    InvalidTrace(String),
}
