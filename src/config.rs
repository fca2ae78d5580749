use crate::debounce::DEFAULT_PRESS_TICKS;
use crate::fifo::OverflowPolicy;
use crate::printer::DEFAULT_SECTOR_TICKS;
use crate::reset::DEFAULT_MIN_RESET_TICKS;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_ENGINE_PERIOD: u32 = 64;

/// Key port tuning. Every field has a default so partial JSON files work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Consecutive ticks a key must stay asserted before it counts as pressed.
    pub press_threshold: u16,
    pub min_reset_ticks: u32,
    pub key_overflow: OverflowPolicy,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            press_threshold: DEFAULT_PRESS_TICKS,
            min_reset_ticks: DEFAULT_MIN_RESET_TICKS,
            key_overflow: OverflowPolicy::DropNewest,
        }
    }
}

impl PortConfig {
    pub fn validate(&self) -> Result<()> {
        if self.press_threshold == 0 {
            return Err(CoreError::InvalidConfig(
                "press_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub port: PortConfig,
    pub print_overflow: OverflowPolicy,
    /// Ticks per printer drum sector.
    pub sector_ticks: u32,
    /// Ticks between two key events taken by the engine.
    pub engine_period: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            port: PortConfig::default(),
            print_overflow: OverflowPolicy::DropNewest,
            sector_ticks: DEFAULT_SECTOR_TICKS,
            engine_period: DEFAULT_ENGINE_PERIOD,
        }
    }
}

impl MachineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.port.validate()?;
        if self.sector_ticks == 0 {
            return Err(CoreError::InvalidConfig(
                "sector_ticks must be at least 1".to_string(),
            ));
        }
        if self.engine_period == 0 {
            return Err(CoreError::InvalidConfig(
                "engine_period must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
