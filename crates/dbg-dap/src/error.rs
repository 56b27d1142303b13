use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Outcome class of a command, carried on the wire as an HRESULT-style code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,
    GenericFailure,
    NotImplemented,
    InvalidArgument,
}

impl ResultCode {
    pub fn code(self) -> u32 {
        match self {
            ResultCode::Success => 0x0000_0000,
            ResultCode::GenericFailure => 0x8000_4005,
            ResultCode::NotImplemented => 0x8000_4001,
            ResultCode::InvalidArgument => 0x8007_0057,
        }
    }

    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.code())
    }
}

/// Failure reported by a command handler or by the debugging engine.
///
/// `message` is what the client sees; when it is absent the response builder
/// synthesizes one from the command name and the numeric code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    pub code: ResultCode,
    pub message: Option<String>,
}

impl CommandError {
    pub fn new(code: ResultCode) -> Self {
        Self { code, message: None }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            code: ResultCode::GenericFailure,
            message: Some(message.into()),
        }
    }

    pub fn not_implemented() -> Self {
        Self::new(ResultCode::NotImplemented)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            code: ResultCode::InvalidArgument,
            message: Some(message.into()),
        }
    }

    /// Text placed in the `message` field of a failed response.
    pub fn response_message(&self, command: &str) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => format!("Failed command '{}' : {}", command, self.code),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} ({})", message, self.code),
            None => write!(f, "command failed ({})", self.code),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::generic(format!("Failed to encode response body: {}", e))
    }
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to open traffic log '{}': {source}", .path.display())]
    TrafficLog { path: PathBuf, source: io::Error },
    #[error("Invalid configuration: {0}")]
    Config(String),
}
