pub mod args;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod exception;
pub mod log;
pub mod output;
pub mod protocol;
pub mod server;
pub mod transport;

#[cfg(test)]
mod testing;

pub use commands::{Dispatcher, adapter_capabilities};
pub use config::AdapterConfig;
pub use engine::DebuggingEngine;
pub use error::{AdapterError, CommandError, ResultCode};
pub use events::EventEmitter;
pub use exception::ExceptionBreakMode;
pub use output::ProtocolOutput;
pub use server::{Adapter, start};
pub use transport::FrameReader;
