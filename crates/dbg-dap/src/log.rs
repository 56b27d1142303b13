use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use dap::types::OutputEventCategory;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::AdapterError;
use crate::events::EventEmitter;

/// `tracing` writer that hands each formatted line to a channel.
///
/// The receiving side relays lines to the client console, so tracing calls
/// never touch the output lock themselves.
#[derive(Clone)]
pub struct DebugConsoleWriter {
    sender: Sender<String>,
}

impl DebugConsoleWriter {
    pub fn new() -> (Self, Receiver<String>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { sender: tx }, rx)
    }
}

impl Write for DebugConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A closed channel only means nobody is forwarding anymore.
        let _ = self.sender.send(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DebugConsoleWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Relays diagnostics lines to the client as console output until either side goes away.
pub fn spawn_console_forwarder(log_rx: Receiver<String>, events: EventEmitter) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in log_rx {
            if events.try_output(OutputEventCategory::Console, &line).is_err() {
                break;
            }
        }
    })
}

/// Direction of a mirrored protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traffic {
    Command,
    Response,
    Event,
}

impl Traffic {
    pub fn prefix(self) -> &'static str {
        match self {
            Traffic::Command => "-> (C) ",
            Traffic::Response => "<- (R) ",
            Traffic::Event => "<- (E) ",
        }
    }
}

/// Mirror of every inbound and outbound protocol message.
#[derive(Debug, Default)]
pub enum TrafficLog {
    #[default]
    Disabled,
    File(File),
    /// Re-emitted to the client as `output`/`console` events.
    Console,
}

impl TrafficLog {
    pub fn file(path: &Path) -> Result<Self, AdapterError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(TrafficLog::File)
            .map_err(|source| AdapterError::TrafficLog {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, TrafficLog::Disabled)
    }

    /// Line as it appears in the log.
    pub fn format(direction: Traffic, text: &str) -> String {
        format!("{}{}", direction.prefix(), text)
    }
}
