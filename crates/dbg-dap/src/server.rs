use std::io::{self, BufRead, BufReader, BufWriter};
use std::sync::Arc;

use dap::types::OutputEventCategory;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{CommandContext, Dispatcher, ExitFlag};
use crate::config::{AdapterConfig, Diagnostics, LaunchConfig};
use crate::engine::{DebuggingEngine, DisconnectAction};
use crate::error::{AdapterError, CommandError};
use crate::events::EventEmitter;
use crate::log::{DebugConsoleWriter, spawn_console_forwarder};
use crate::output::ProtocolOutput;
use crate::protocol::{Outbound, RejectedRequest, Request, decode_request};
use crate::transport::FrameReader;

type DynResult<T> = miette::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Runs an adapter session over stdin/stdout until the client disconnects.
///
/// `make_engine` receives the emitter the engine uses for asynchronous events.
pub fn start<F>(config: AdapterConfig, make_engine: F) -> DynResult<()>
where
    F: FnOnce(EventEmitter) -> Arc<dyn DebuggingEngine>,
{
    let traffic = config.traffic_log.open()?;
    let output = Arc::new(ProtocolOutput::new(BufWriter::new(io::stdout()), traffic));
    let events = EventEmitter::new(output);

    init_tracing(&config, &events);
    info!("Starting debug adapter");

    let engine = make_engine(events.clone());
    let adapter = Adapter::new(engine, events, config.launch);
    adapter.run(BufReader::new(io::stdin()))?;

    info!("Debug adapter stopped");
    Ok(())
}

fn init_tracing(config: &AdapterConfig, events: &EventEmitter) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    let installed = match config.diagnostics {
        Diagnostics::Stderr => builder.with_writer(io::stderr).try_init(),
        Diagnostics::Console => {
            let (writer, log_rx) = DebugConsoleWriter::new();
            // Detached: the subscriber keeps the sender alive for the whole process.
            spawn_console_forwarder(log_rx, events.clone());
            builder.with_writer(writer).try_init()
        }
    };

    if let Err(e) = installed {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
}

/// The command loop: reads requests, dispatches them, writes responses.
pub struct Adapter {
    engine: Arc<dyn DebuggingEngine>,
    events: EventEmitter,
    dispatcher: Dispatcher,
    launch: LaunchConfig,
    exit: ExitFlag,
}

impl Adapter {
    pub fn new(engine: Arc<dyn DebuggingEngine>, events: EventEmitter, launch: LaunchConfig) -> Self {
        Self {
            engine,
            events,
            dispatcher: Dispatcher::new(),
            launch,
            exit: ExitFlag::default(),
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.is_set()
    }

    /// Emitter sharing this session's output stream and sequence.
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    fn output(&self) -> &ProtocolOutput {
        self.events.output()
    }

    /// Serves requests from `reader` until `disconnect` or end of input.
    ///
    /// If the session ends without a `disconnect` the engine still gets a
    /// default disconnect so the debuggee is not left suspended.
    pub fn run<R: BufRead>(&self, reader: R) -> Result<(), AdapterError> {
        let mut frames = FrameReader::new(reader);
        let result = self.serve(&mut frames);

        if let Err(e) = &result {
            error!(error = %e, "Session aborted");
        }
        if !self.exit.is_set() {
            info!("Client went away without disconnect");
            self.engine.disconnect(DisconnectAction::Default);
        }
        result
    }

    fn serve<R: BufRead>(&self, frames: &mut FrameReader<R>) -> Result<(), AdapterError> {
        while !self.exit.is_set() {
            let Some(frame) = frames.read_frame() else {
                info!("Client disconnected or stream ended");
                break;
            };
            self.handle_frame(&frame)?;
        }
        Ok(())
    }

    fn handle_frame(&self, frame: &[u8]) -> Result<(), AdapterError> {
        self.output().log_inbound(&String::from_utf8_lossy(frame));

        match decode_request(frame) {
            Ok(request) => self.handle_request(request),
            Err(rejected) => self.reject(rejected),
        }
    }

    fn handle_request(&self, request: Request) -> Result<(), AdapterError> {
        if let Some(kind) = request.kind.as_deref().filter(|kind| *kind != "request") {
            warn!(seq = request.seq, kind, "Message type is not 'request'; dispatching anyway");
        }
        debug!(seq = request.seq, command = %request.command, "Dispatching request");

        let ctx = CommandContext {
            engine: self.engine.as_ref(),
            events: &self.events,
            exit: &self.exit,
            launch: &self.launch,
        };
        let result = self
            .dispatcher
            .dispatch(&ctx, &request.command, &request.arguments);

        if let Err(e) = &result {
            warn!(seq = request.seq, command = %request.command, error = %e, "Request failed");
        }

        self.output()
            .emit(&Outbound::response(request.seq, &request.command, result))?;
        Ok(())
    }

    fn reject(&self, rejected: RejectedRequest) -> Result<(), AdapterError> {
        warn!(reason = %rejected.reason, "Dropping malformed request");

        match rejected.seq {
            Some(seq) => {
                let command = rejected.command.unwrap_or_default();
                let error = CommandError::invalid_argument(rejected.reason);
                self.output()
                    .emit(&Outbound::response(seq, &command, Err(error)))?;
            }
            None => {
                self.events.try_output(
                    OutputEventCategory::Console,
                    &format!("Dropped malformed request: {}\n", rejected.reason),
                )?;
            }
        }
        Ok(())
    }
}
