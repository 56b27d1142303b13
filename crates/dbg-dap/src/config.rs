use std::path::PathBuf;

use serde::Deserialize;

use crate::error::AdapterError;
use crate::log::TrafficLog;

pub const DEFAULT_LOG_FILTER: &str = "dbg_dap=info";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfig {
    pub traffic_log: TrafficLogConfig,
    pub launch: LaunchConfig,
    pub diagnostics: Diagnostics,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            traffic_log: TrafficLogConfig::default(),
            launch: LaunchConfig::default(),
            diagnostics: Diagnostics::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AdapterConfig {
    pub fn from_json(text: &str) -> Result<Self, AdapterError> {
        serde_json::from_str(text).map_err(|e| AdapterError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLogConfig {
    #[default]
    Disabled,
    Console,
    File(PathBuf),
}

impl TrafficLogConfig {
    pub fn open(&self) -> Result<TrafficLog, AdapterError> {
        match self {
            TrafficLogConfig::Disabled => Ok(TrafficLog::Disabled),
            TrafficLogConfig::Console => Ok(TrafficLog::Console),
            TrafficLogConfig::File(path) => TrafficLog::file(path),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchConfig {
    /// Replaces whatever program the client asks for.
    pub exec_override: Option<ExecOverride>,
    /// Host executable that runs the requested program as its first argument.
    pub launcher: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExecOverride {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Where the adapter's own `tracing` output goes.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Diagnostics {
    #[default]
    Stderr,
    Console,
}
