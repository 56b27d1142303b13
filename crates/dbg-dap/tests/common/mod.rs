#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use dbg_dap::EventEmitter;
use dbg_dap::ProtocolOutput;
use dbg_dap::config::LaunchConfig;
use dbg_dap::engine::{
    Breakpoint, DebuggingEngine, DisconnectAction, EngineResult, ExceptionDetails, ExceptionInfo,
    FunctionBreakpoint, LaunchRequest, Scope, SourceBreakpoint, StackFrame, StackTrace, StepKind,
    Thread, Variable, VariablesFilter,
};
use dbg_dap::log::TrafficLog;
use dbg_dap::server::Adapter;
use dbg_dap::transport::FrameReader;
use dbg_dap::{CommandError, ExceptionBreakMode};
use serde_json::{Value, json};

/// One recorded engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initialize,
    InsertExceptionBreakpoint(ExceptionBreakMode, String),
    ConfigurationDone,
    ExceptionInfo(i64),
    SetBreakpoints(String, Vec<SourceBreakpoint>),
    SetFunctionBreakpoints(Vec<FunctionBreakpoint>),
    Launch(LaunchRequest),
    Attach(i64),
    Threads,
    Disconnect(DisconnectAction),
    StackTrace(i64, i64, i64),
    Continue(i64),
    Pause,
    Step(i64, StepKind),
    Scopes(i64),
    Variables(i64, VariablesFilter, i64, i64),
    Evaluate(i64, String),
    SetVariable(String, String, i64),
}

/// Engine that records every call and answers with canned data.
#[derive(Default)]
pub struct MockEngine {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    pub last_stopped_thread: i64,
    exception_mode: Option<ExceptionBreakMode>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            last_stopped_thread: 7,
            ..Default::default()
        }
    }

    pub fn with_exception_mode(mut self, mode: ExceptionBreakMode) -> Self {
        self.exception_mode = Some(mode);
        self
    }

    /// Makes the named engine operation fail with `GenericFailure` and no message.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str, call: Call) -> EngineResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(operation) {
            Err(CommandError::new(dbg_dap::ResultCode::GenericFailure))
        } else {
            Ok(())
        }
    }
}

pub fn breakpoint(id: i64, line: i64) -> Breakpoint {
    Breakpoint {
        id: Some(id),
        verified: true,
        message: None,
        source: None,
        line: Some(line),
        column: None,
        end_line: None,
        end_column: None,
        instruction_reference: None,
        offset: None,
    }
}

pub fn variable(name: &str, value: &str, reference: i64) -> Variable {
    Variable {
        name: name.to_string(),
        value: value.to_string(),
        type_field: Some("int".to_string()),
        presentation_hint: None,
        evaluate_name: Some(name.to_string()),
        variables_reference: reference,
        named_variables: if reference > 0 { Some(2) } else { None },
        indexed_variables: None,
        memory_reference: None,
    }
}

impl DebuggingEngine for MockEngine {
    fn initialize(&self) -> EngineResult<()> {
        self.record("initialize", Call::Initialize)
    }

    fn insert_exception_breakpoint(&self, mode: ExceptionBreakMode, scope: &str) -> EngineResult<u32> {
        self.record(
            "insert_exception_breakpoint",
            Call::InsertExceptionBreakpoint(mode, scope.to_string()),
        )?;
        Ok(1)
    }

    fn configuration_done(&self) -> EngineResult<()> {
        self.record("configuration_done", Call::ConfigurationDone)
    }

    fn exception_info(&self, thread_id: i64) -> EngineResult<ExceptionInfo> {
        self.record("exception_info", Call::ExceptionInfo(thread_id))?;
        Ok(ExceptionInfo {
            break_mode: self.exception_mode.unwrap_or(ExceptionBreakMode::UNHANDLED),
            exception_id: "System.InvalidOperationException".to_string(),
            description: "Operation is not valid".to_string(),
            details: ExceptionDetails {
                message: "Operation is not valid".to_string(),
                type_name: "InvalidOperationException".to_string(),
                full_type_name: "System.InvalidOperationException".to_string(),
                evaluate_name: "$exception".to_string(),
                stack_trace: "at App.Main()".to_string(),
                inner_exception: vec![ExceptionDetails {
                    message: "inner".to_string(),
                    ..Default::default()
                }],
            },
        })
    }

    fn set_breakpoints(&self, path: &str, breakpoints: &[SourceBreakpoint]) -> EngineResult<Vec<Breakpoint>> {
        self.record(
            "set_breakpoints",
            Call::SetBreakpoints(path.to_string(), breakpoints.to_vec()),
        )?;
        Ok(breakpoints
            .iter()
            .enumerate()
            .map(|(i, bp)| breakpoint(i as i64 + 1, bp.line))
            .collect())
    }

    fn set_function_breakpoints(&self, breakpoints: &[FunctionBreakpoint]) -> EngineResult<Vec<Breakpoint>> {
        self.record(
            "set_function_breakpoints",
            Call::SetFunctionBreakpoints(breakpoints.to_vec()),
        )?;
        Ok(breakpoints
            .iter()
            .enumerate()
            .map(|(i, _)| breakpoint(i as i64 + 1, 0))
            .collect())
    }

    fn launch(&self, request: &LaunchRequest) -> EngineResult<()> {
        self.record("launch", Call::Launch(request.clone()))
    }

    fn attach(&self, pid: i64) -> EngineResult<()> {
        self.record("attach", Call::Attach(pid))
    }

    fn threads(&self) -> EngineResult<Vec<Thread>> {
        self.record("threads", Call::Threads)?;
        Ok(vec![
            Thread {
                id: 1,
                name: "Main Thread".to_string(),
            },
            Thread {
                id: 7,
                name: "Worker".to_string(),
            },
        ])
    }

    fn disconnect(&self, action: DisconnectAction) {
        self.calls.lock().unwrap().push(Call::Disconnect(action));
    }

    fn stack_trace(&self, thread_id: i64, start_frame: i64, levels: i64) -> EngineResult<StackTrace> {
        self.record("stack_trace", Call::StackTrace(thread_id, start_frame, levels))?;
        Ok(StackTrace {
            frames: vec![StackFrame {
                id: self.frame_id(thread_id, 0),
                name: "App.Main()".to_string(),
                line: 12,
                column: 1,
                ..Default::default()
            }],
            total_frames: 3,
        })
    }

    fn continue_execution(&self, thread_id: i64) -> EngineResult<()> {
        self.record("continue_execution", Call::Continue(thread_id))
    }

    fn pause(&self) -> EngineResult<()> {
        self.record("pause", Call::Pause)
    }

    fn step(&self, thread_id: i64, kind: StepKind) -> EngineResult<()> {
        self.record("step", Call::Step(thread_id, kind))
    }

    fn scopes(&self, frame_id: i64) -> EngineResult<Vec<Scope>> {
        self.record("scopes", Call::Scopes(frame_id))?;
        Ok(vec![Scope {
            name: "Locals".to_string(),
            presentation_hint: None,
            variables_reference: 1000,
            named_variables: Some(2),
            indexed_variables: None,
            expensive: false,
            source: None,
            line: None,
            column: None,
            end_line: None,
            end_column: None,
        }])
    }

    fn variables(
        &self,
        reference: i64,
        filter: VariablesFilter,
        start: i64,
        count: i64,
    ) -> EngineResult<Vec<Variable>> {
        self.record("variables", Call::Variables(reference, filter, start, count))?;
        Ok(vec![variable("x", "1", 0), variable("list", "{List}", 1001)])
    }

    fn evaluate(&self, frame_id: i64, expression: &str) -> EngineResult<Variable> {
        self.record("evaluate", Call::Evaluate(frame_id, expression.to_string()))?;
        match expression {
            "list" => Ok(variable("list", "{List}", 1001)),
            "oops" => Err(CommandError::generic("error CS0103: The name 'oops' does not exist")),
            _ => Ok(variable(expression, "42", 0)),
        }
    }

    fn set_variable(&self, name: &str, value: &str, reference: i64) -> EngineResult<String> {
        self.record(
            "set_variable",
            Call::SetVariable(name.to_string(), value.to_string(), reference),
        )?;
        Ok(value.to_string())
    }

    fn last_stopped_thread_id(&self) -> i64 {
        self.last_stopped_thread
    }
}

/// Clonable in-memory writer standing in for stdout.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Decodes every frame written so far.
pub fn frames(buffer: &SharedBuffer) -> Vec<Value> {
    let mut reader = FrameReader::new(Cursor::new(buffer.bytes()));
    std::iter::from_fn(|| reader.read_frame())
        .map(|frame| serde_json::from_slice(&frame).unwrap())
        .collect()
}

pub fn responses(buffer: &SharedBuffer) -> Vec<Value> {
    frames(buffer)
        .into_iter()
        .filter(|frame| frame["type"] == "response")
        .collect()
}

/// Encodes requests the way a client would put them on the wire.
pub fn client_stream(requests: &[Value]) -> Cursor<Vec<u8>> {
    let mut bytes = Vec::new();
    for request in requests {
        let body = serde_json::to_vec(request).unwrap();
        bytes.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
        bytes.extend_from_slice(&body);
    }
    Cursor::new(bytes)
}

pub fn request(seq: i64, command: &str, arguments: Value) -> Value {
    json!({"seq": seq, "type": "request", "command": command, "arguments": arguments})
}

pub struct Session {
    pub engine: Arc<MockEngine>,
    pub adapter: Adapter,
    pub stdout: SharedBuffer,
}

impl Session {
    pub fn new(engine: MockEngine) -> Self {
        Self::with(engine, LaunchConfig::default(), TrafficLog::Disabled)
    }

    pub fn with(engine: MockEngine, launch: LaunchConfig, traffic: TrafficLog) -> Self {
        let stdout = SharedBuffer::default();
        let output = Arc::new(ProtocolOutput::new(stdout.clone(), traffic));
        let engine = Arc::new(engine);
        let adapter = Adapter::new(engine.clone(), EventEmitter::new(output), launch);
        Self {
            engine,
            adapter,
            stdout,
        }
    }

    /// Runs the adapter over `requests` and returns every response written.
    pub fn run(&self, requests: &[Value]) -> Vec<Value> {
        self.adapter.run(client_stream(requests)).unwrap();
        responses(&self.stdout)
    }
}
