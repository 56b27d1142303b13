use std::collections::BTreeMap;

pub use dap::types::{Breakpoint, Scope, StackFrame, Thread, Variable};

use crate::error::CommandError;
use crate::exception::ExceptionBreakMode;

pub type EngineResult<T> = Result<T, CommandError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBreakpoint {
    pub line: i64,
    pub condition: String,
}

/// Function breakpoint decomposed from `[module!]name[(params)]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionBreakpoint {
    pub module: String,
    pub name: String,
    pub params: String,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub exe: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: String,
    pub stop_at_entry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectAction {
    Default,
    Terminate,
    Detach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Over,
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariablesFilter {
    Named,
    Indexed,
    Both,
}

#[derive(Debug, Clone)]
pub struct StackTrace {
    pub frames: Vec<StackFrame>,
    pub total_frames: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExceptionDetails {
    pub message: String,
    pub type_name: String,
    pub full_type_name: String,
    pub evaluate_name: String,
    pub stack_trace: String,
    pub inner_exception: Vec<ExceptionDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub break_mode: ExceptionBreakMode,
    pub exception_id: String,
    pub description: String,
    pub details: ExceptionDetails,
}

/// Debugging backend driven by the command loop.
///
/// Calls block the command loop until they return. Implementations may raise
/// events from their own threads through an [`crate::EventEmitter`].
pub trait DebuggingEngine: Send + Sync {
    fn initialize(&self) -> EngineResult<()>;

    fn insert_exception_breakpoint(&self, mode: ExceptionBreakMode, scope: &str) -> EngineResult<u32>;

    fn configuration_done(&self) -> EngineResult<()>;

    /// Current exception on `thread_id`; an error when the thread has none.
    fn exception_info(&self, thread_id: i64) -> EngineResult<ExceptionInfo>;

    fn set_breakpoints(&self, path: &str, breakpoints: &[SourceBreakpoint]) -> EngineResult<Vec<Breakpoint>>;

    fn set_function_breakpoints(&self, breakpoints: &[FunctionBreakpoint]) -> EngineResult<Vec<Breakpoint>>;

    fn launch(&self, request: &LaunchRequest) -> EngineResult<()>;

    fn attach(&self, pid: i64) -> EngineResult<()>;

    fn threads(&self) -> EngineResult<Vec<Thread>>;

    fn disconnect(&self, action: DisconnectAction);

    fn stack_trace(&self, thread_id: i64, start_frame: i64, levels: i64) -> EngineResult<StackTrace>;

    fn continue_execution(&self, thread_id: i64) -> EngineResult<()>;

    fn pause(&self) -> EngineResult<()>;

    fn step(&self, thread_id: i64, kind: StepKind) -> EngineResult<()>;

    fn scopes(&self, frame_id: i64) -> EngineResult<Vec<Scope>>;

    fn variables(
        &self,
        reference: i64,
        filter: VariablesFilter,
        start: i64,
        count: i64,
    ) -> EngineResult<Vec<Variable>>;

    /// On failure the error message carries the engine's output text.
    fn evaluate(&self, frame_id: i64, expression: &str) -> EngineResult<Variable>;

    /// Returns the new value as rendered by the engine.
    fn set_variable(&self, name: &str, value: &str, reference: i64) -> EngineResult<String>;

    fn last_stopped_thread_id(&self) -> i64;

    /// Frame id of the frame at `level` on `thread_id`.
    fn frame_id(&self, thread_id: i64, level: i64) -> i64 {
        frame_id(thread_id, level)
    }
}

/// Default frame id: thread id in the high half, frame level in the low half.
pub fn frame_id(thread_id: i64, level: i64) -> i64 {
    (thread_id << 32) | (level & 0xffff_ffff)
}
