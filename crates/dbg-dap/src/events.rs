use std::sync::Arc;

use dap::events::{ExitedEventBody, OutputEventBody};
use dap::types::{Capabilities, OutputEventCategory};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::engine::Breakpoint;
use crate::error::AdapterError;
use crate::output::ProtocolOutput;
use crate::protocol::Outbound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    Step,
    Breakpoint,
    Exception,
    Pause,
    Entry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadReason {
    Started,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeReason {
    New,
    Changed,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolStatus {
    Skipped,
    Loaded,
    NotFound,
}

impl SymbolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolStatus::Skipped => "Skipped loading symbols.",
            SymbolStatus::Loaded => "Symbols loaded.",
            SymbolStatus::NotFound => "Symbols not found.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub path: String,
    pub symbol_status: SymbolStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContinuedBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<i64>,
    all_threads_continued: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoppedBody<'a> {
    reason: StopReason,
    description: &'a str,
    thread_id: i64,
    text: &'a str,
    all_threads_stopped: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreadBody {
    reason: ThreadReason,
    thread_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleRecord<'a> {
    id: &'a str,
    name: &'a str,
    path: &'a str,
    symbol_status: &'static str,
}

#[derive(Serialize)]
struct ModuleBody<'a> {
    reason: ChangeReason,
    module: ModuleRecord<'a>,
}

#[derive(Serialize)]
struct BreakpointBody<'a> {
    reason: ChangeReason,
    breakpoint: &'a Breakpoint,
}

/// Notifications raised by the debugging engine, from any thread.
///
/// Each call is fire-and-forget: write failures are logged, never returned.
#[derive(Clone)]
pub struct EventEmitter {
    output: Arc<ProtocolOutput>,
}

impl EventEmitter {
    pub fn new(output: Arc<ProtocolOutput>) -> Self {
        Self { output }
    }

    pub fn output(&self) -> &Arc<ProtocolOutput> {
        &self.output
    }

    /// `None` means every thread resumed.
    pub fn continued(&self, thread_id: Option<i64>) {
        self.notify(
            "continued",
            ContinuedBody {
                thread_id,
                all_threads_continued: true,
            },
        );
    }

    pub fn stopped(
        &self,
        reason: StopReason,
        thread_id: i64,
        description: &str,
        text: &str,
        all_threads_stopped: bool,
    ) {
        self.notify(
            "stopped",
            StoppedBody {
                reason,
                description,
                thread_id,
                text,
                all_threads_stopped,
            },
        );
    }

    pub fn exited(&self, exit_code: i64) {
        self.notify("exited", ExitedEventBody { exit_code });
    }

    pub fn terminated(&self) {
        self.notify("terminated", json!({}));
    }

    pub fn thread(&self, reason: ThreadReason, thread_id: i64) {
        self.notify("thread", ThreadBody { reason, thread_id });
    }

    pub fn module(&self, reason: ChangeReason, module: &Module) {
        self.notify(
            "module",
            ModuleBody {
                reason,
                module: ModuleRecord {
                    id: &module.id,
                    name: &module.name,
                    path: &module.path,
                    symbol_status: module.symbol_status.as_str(),
                },
            },
        );
    }

    pub fn output_text(&self, category: OutputEventCategory, text: &str) {
        if let Err(e) = self.try_output(category, text) {
            error!(error = %e, "Failed to send output event");
        }
    }

    /// Like [`EventEmitter::output_text`] but reports the failure to the caller.
    pub fn try_output(&self, category: OutputEventCategory, text: &str) -> Result<u64, AdapterError> {
        self.send(
            "output",
            OutputEventBody {
                category: Some(category),
                output: text.to_owned(),
                group: None,
                variables_reference: None,
                source: None,
                line: None,
                column: None,
                data: None,
            },
        )
    }

    pub fn breakpoint(&self, reason: ChangeReason, breakpoint: &Breakpoint) {
        self.notify("breakpoint", BreakpointBody { reason, breakpoint });
    }

    pub fn initialized(&self) {
        self.notify("initialized", json!({}));
    }

    pub fn capabilities(&self, capabilities: &Capabilities) {
        self.notify("capabilities", json!({ "capabilities": capabilities }));
    }

    fn send(&self, event: &'static str, body: impl Serialize) -> Result<u64, AdapterError> {
        let body = serde_json::to_value(body)?;
        self.output.emit(&Outbound::event(event, body))
    }

    fn notify(&self, event: &'static str, body: impl Serialize) {
        if let Err(e) = self.send(event, body) {
            error!(error = %e, event, "Failed to send event");
        }
    }
}
