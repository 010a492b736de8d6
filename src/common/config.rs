//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// How to reach the debugger under test
    #[serde(default)]
    pub debugger: DebuggerConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Hot reload delta generation
    #[serde(default)]
    pub delta: DeltaConfig,
}

/// Debugger launch settings
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DebuggerConfig {
    /// Shell command that starts the debugger (run through `sh -c`)
    pub command: Option<String>,

    /// Address of an already running debugger to attach to instead
    pub connect: Option<String>,
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Default timeout for `expect` in scripts
    #[serde(default = "default_expect")]
    pub expect_secs: u64,

    /// Grace period between closing stdin and killing the debugger
    #[serde(default = "default_close_grace")]
    pub close_grace_ms: u64,

    /// Timeout for connecting to a listening debugger
    #[serde(default = "default_connect")]
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            expect_secs: default_expect(),
            close_grace_ms: default_close_grace(),
            connect_secs: default_connect(),
        }
    }
}

fn default_expect() -> u64 {
    10
}
fn default_close_grace() -> u64 {
    500
}
fn default_connect() -> u64 {
    10
}

impl Timeouts {
    pub fn expect(&self) -> Duration {
        Duration::from_secs(self.expect_secs)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

/// Delta generation settings
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DeltaConfig {
    /// Shell command producing a delta artifact
    pub command: Option<String>,

    /// Directory where new sources and artifacts are written
    pub work_dir: Option<PathBuf>,
}

/// Where the bridge should get its debugger from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerTarget {
    /// Spawn this shell command
    Spawn(String),
    /// Connect to this TCP address
    Connect(String),
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Resolve the debugger target, preferring an attach address
    ///
    /// Fails when neither a command nor an address is configured.
    pub fn debugger_target(&self) -> Result<DebuggerTarget> {
        if let Some(addr) = self.debugger.connect.as_deref().filter(|a| !a.trim().is_empty()) {
            return Ok(DebuggerTarget::Connect(addr.trim().to_string()));
        }
        match self.debugger.command.as_deref().map(str::trim) {
            Some(cmd) if !cmd.is_empty() => Ok(DebuggerTarget::Spawn(cmd.to_string())),
            _ => Err(Error::Config(
                "no debugger command configured; set [debugger] command or pass --debugger"
                    .to_string(),
            )),
        }
    }
}
