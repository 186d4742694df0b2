//! TOML configuration shared by the assembler and runner binaries.
//!
//! ```toml
//! [assembler]
//! base_address = 0
//!
//! [runtime]
//! batch_size = 3000
//! tick_interval_ms = 10
//! max_steps = 1000000
//! breakpoints = [0x10]
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use crate::interpreter::DEFAULT_BATCH_SIZE;
use crate::vm::Word;
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub assembler: AssemblerConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Logical address of the first emitted word
    pub base_address: Word,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Instructions per host-scheduler batch
    pub batch_size: usize,
    /// Pause between batches in the runner
    pub tick_interval_ms: u64,
    /// Stop the runner after this many instructions
    pub max_steps: Option<u64>,
    /// Addresses with a breakpoint set at load
    pub breakpoints: Vec<Word>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_steps: None,
            breakpoints: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Cannot read configuration: {}", e),
            ConfigError::Parse(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        debug!("loading configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        Config::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
