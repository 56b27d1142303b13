use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tracing::warn;

use crate::error::AdapterError;
use crate::log::{Traffic, TrafficLog};
use crate::protocol::{Envelope, Outbound, Sequencer};
use crate::transport;

/// The single exclusion point for everything written to the client.
///
/// Sequence assignment, serialization, the frame write and traffic logging for
/// one message all happen under one lock, so wire order matches `seq` order.
pub struct ProtocolOutput {
    state: Mutex<OutputState>,
}

struct OutputState {
    sequencer: Sequencer,
    writer: Box<dyn Write + Send>,
    traffic: TrafficLog,
}

impl ProtocolOutput {
    pub fn new(writer: impl Write + Send + 'static, traffic: TrafficLog) -> Self {
        Self {
            state: Mutex::new(OutputState {
                sequencer: Sequencer::default(),
                writer: Box::new(writer),
                traffic,
            }),
        }
    }

    /// Writes `message` and returns the `seq` it was sent with.
    ///
    /// Only a failed frame write is an error; traffic log failures are reported
    /// through `tracing` once the frame is out.
    pub fn emit(&self, message: &Outbound) -> Result<u64, AdapterError> {
        let mut state = self.lock();
        let (seq, payload) = state.write(message)?;
        let direction = match message {
            Outbound::Response(_) => Traffic::Response,
            Outbound::Event(_) => Traffic::Event,
        };
        state.mirror_or_warn(direction, &payload);
        Ok(seq)
    }

    /// Mirrors an inbound request body into the traffic log.
    pub fn log_inbound(&self, text: &str) {
        let mut state = self.lock();
        if state.traffic.is_enabled() {
            state.mirror_or_warn(Traffic::Command, text);
        }
    }

    fn lock(&self) -> MutexGuard<'_, OutputState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputState {
    fn write(&mut self, message: &Outbound) -> Result<(u64, String), AdapterError> {
        let payload = serde_json::to_string(&Envelope {
            seq: self.sequencer.peek(),
            message,
        })?;
        let seq = self.sequencer.advance();
        transport::write_frame(&mut self.writer, payload.as_bytes())?;
        Ok((seq, payload))
    }

    fn mirror_or_warn(&mut self, direction: Traffic, text: &str) {
        if let Err(e) = self.mirror(direction, text) {
            warn!(error = %e, ?direction, "Failed to write traffic log");
        }
    }

    fn mirror(&mut self, direction: Traffic, text: &str) -> Result<(), AdapterError> {
        let line = TrafficLog::format(direction, text);
        if matches!(self.traffic, TrafficLog::Console) {
            // Written directly: the lock is already held and the echo is not mirrored again.
            let echo = Outbound::event(
                "output",
                json!({ "category": "console", "output": format!("{}\n", line) }),
            );
            return self.write(&echo).map(|_| ());
        }

        if let TrafficLog::File(file) = &mut self.traffic {
            writeln!(file, "{}", line)?;
            file.flush()?;
        }
        Ok(())
    }
}
