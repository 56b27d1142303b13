use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use dap::types::Capabilities;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::args::Arguments;
use crate::config::LaunchConfig;
use crate::engine::{
    DebuggingEngine, DisconnectAction, ExceptionDetails, FunctionBreakpoint, LaunchRequest,
    SourceBreakpoint, StepKind, VariablesFilter,
};
use crate::error::{CommandError, ResultCode};
use crate::events::EventEmitter;
use crate::exception::ExceptionBreakMode;

pub type CommandResult = Result<Value, CommandError>;

type Handler = fn(&CommandContext<'_>, &Arguments<'_>) -> CommandResult;

/// Scope of every exception breakpoint the adapter installs.
const GLOBAL_EXCEPTION_SCOPE: &str = "*";

/// Set once the client asked to disconnect; checked between commands.
#[derive(Debug, Default)]
pub struct ExitFlag(AtomicBool);

impl ExitFlag {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a handler may touch.
pub struct CommandContext<'a> {
    pub engine: &'a dyn DebuggingEngine,
    pub events: &'a EventEmitter,
    pub exit: &'a ExitFlag,
    pub launch: &'a LaunchConfig,
}

pub struct Dispatcher {
    handlers: FxHashMap<&'static str, Handler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let table: [(&'static str, Handler); 20] = [
            ("initialize", initialize),
            ("setExceptionBreakpoints", set_exception_breakpoints),
            ("configurationDone", configuration_done),
            ("exceptionInfo", exception_info),
            ("setBreakpoints", set_breakpoints),
            ("launch", launch),
            ("threads", threads),
            ("disconnect", disconnect),
            ("stackTrace", stack_trace),
            ("continue", continue_execution),
            ("pause", pause),
            ("next", next),
            ("stepIn", step_in),
            ("stepOut", step_out),
            ("scopes", scopes),
            ("variables", variables),
            ("evaluate", evaluate),
            ("attach", attach),
            ("setVariable", set_variable),
            ("setFunctionBreakpoints", set_function_breakpoints),
        ];

        Self {
            handlers: table.into_iter().collect(),
        }
    }

    pub fn dispatch(&self, ctx: &CommandContext<'_>, command: &str, arguments: &Value) -> CommandResult {
        match self.handlers.get(command) {
            Some(handler) => handler(ctx, &Arguments::new(arguments)),
            None => Err(CommandError::not_implemented()),
        }
    }

    pub fn supports(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }
}

/// Capabilities advertised in the `initialize` response and `capabilities` event.
pub fn adapter_capabilities() -> Capabilities {
    Capabilities {
        supports_configuration_done_request: Some(true),
        supports_function_breakpoints: Some(true),
        supports_conditional_breakpoints: Some(true),
        support_terminate_debuggee: Some(true),
        supports_exception_info_request: Some(true),
        ..Default::default()
    }
}

fn initialize(ctx: &CommandContext<'_>, _args: &Arguments<'_>) -> CommandResult {
    let capabilities = adapter_capabilities();
    ctx.events.capabilities(&capabilities);
    ctx.engine.initialize()?;
    Ok(serde_json::to_value(capabilities)?)
}

fn set_exception_breakpoints(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let filters = args.strings_or_empty("filters")?;
    let mode = ExceptionBreakMode::from_filters(&filters);
    ctx.engine
        .insert_exception_breakpoint(mode, GLOBAL_EXCEPTION_SCOPE)?;
    Ok(json!({ "supportsExceptionOptions": false }))
}

fn configuration_done(ctx: &CommandContext<'_>, _args: &Arguments<'_>) -> CommandResult {
    ctx.engine.configuration_done()?;
    Ok(json!({}))
}

fn exception_info(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let thread_id = args.i64("threadId")?;
    let info = ctx
        .engine
        .exception_info(thread_id)
        .map_err(|e| CommandError {
            code: ResultCode::GenericFailure,
            message: e.message,
        })?;

    let Some(break_mode) = info.break_mode.keyword() else {
        error!(bits = info.break_mode.bits(), "Engine reported an exception break mode with no keyword");
        return Err(CommandError::generic(format!(
            "Unrecognized exception break mode 0x{:02x}",
            info.break_mode.bits()
        )));
    };

    Ok(json!({
        "breakMode": break_mode,
        "exceptionId": info.exception_id,
        "description": info.description,
        "details": exception_details(&info.details),
    }))
}

/// Converts one level of exception details; only the first inner exception is kept.
fn exception_details(details: &ExceptionDetails) -> Value {
    let inner = details
        .inner_exception
        .first()
        .map(exception_details)
        .into_iter()
        .collect::<Vec<_>>();

    json!({
        "message": details.message,
        "typeName": details.type_name,
        "fullTypeName": details.full_type_name,
        "evaluateName": details.evaluate_name,
        "stackTrace": details.stack_trace,
        "innerException": inner,
    })
}

fn set_breakpoints(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let path = args.object("source")?.str("path")?;
    let requested = args
        .array("breakpoints")?
        .iter()
        .map(|entry| {
            let entry = Arguments::new(entry);
            Ok(SourceBreakpoint {
                line: entry.i64("line")?,
                condition: entry.str_or("condition", "")?.to_owned(),
            })
        })
        .collect::<Result<Vec<_>, CommandError>>()?;

    let breakpoints = ctx.engine.set_breakpoints(path, &requested)?;
    Ok(json!({ "breakpoints": breakpoints }))
}

fn launch(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let cwd = args.str("cwd")?.to_owned();
    let env = decode_env(args.get("env"));
    let stop_at_entry = args.bool_opt("stopAtEntry")?.unwrap_or(false);

    let request = match &ctx.launch.exec_override {
        Some(exec) => LaunchRequest {
            exe: exec.program.clone(),
            args: exec.args.clone(),
            env,
            cwd,
            stop_at_entry,
        },
        None => {
            let program = args.str("program")?;
            let mut argv = vec![program.to_owned()];
            argv.extend(args.strings_or_empty("args")?);
            LaunchRequest {
                exe: ctx
                    .launch
                    .launcher
                    .clone()
                    .unwrap_or_else(|| program.to_owned()),
                args: argv,
                env,
                cwd,
                stop_at_entry,
            }
        }
    };

    ctx.engine.launch(&request)?;
    Ok(json!({}))
}

/// A malformed `env` map falls back to an empty environment instead of failing the launch.
fn decode_env(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(value) = value else {
        return BTreeMap::new();
    };
    match serde_json::from_value(value.clone()) {
        Ok(env) => env,
        Err(e) => {
            info!(error = %e, "Ignoring malformed launch environment");
            BTreeMap::new()
        }
    }
}

fn threads(ctx: &CommandContext<'_>, _args: &Arguments<'_>) -> CommandResult {
    let threads = ctx.engine.threads()?;
    Ok(json!({ "threads": threads }))
}

fn disconnect(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let action = match args.bool_opt("terminateDebuggee")? {
        None => DisconnectAction::Default,
        Some(true) => DisconnectAction::Terminate,
        Some(false) => DisconnectAction::Detach,
    };
    ctx.engine.disconnect(action);
    ctx.exit.set();
    Ok(json!({}))
}

fn stack_trace(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let thread_id = args.i64("threadId")?;
    let start_frame = args.i64_or("startFrame", 0)?;
    let levels = args.i64_or("levels", 0)?;
    let trace = ctx.engine.stack_trace(thread_id, start_frame, levels)?;
    Ok(json!({
        "stackFrames": trace.frames,
        "totalFrames": trace.total_frames,
    }))
}

fn continue_execution(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let thread_id = args.i64("threadId")?;
    ctx.engine.continue_execution(thread_id)?;
    Ok(json!({ "allThreadsContinued": true, "threadId": thread_id }))
}

fn pause(ctx: &CommandContext<'_>, _args: &Arguments<'_>) -> CommandResult {
    ctx.engine.pause()?;
    Ok(json!({}))
}

fn next(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    step(ctx, args, StepKind::Over)
}

fn step_in(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    step(ctx, args, StepKind::In)
}

fn step_out(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    step(ctx, args, StepKind::Out)
}

fn step(ctx: &CommandContext<'_>, args: &Arguments<'_>, kind: StepKind) -> CommandResult {
    let thread_id = args.i64("threadId")?;
    ctx.engine.step(thread_id, kind)?;
    Ok(json!({}))
}

fn scopes(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let scopes = ctx.engine.scopes(args.i64("frameId")?)?;
    Ok(json!({ "scopes": scopes }))
}

fn variables(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let reference = args.i64("variablesReference")?;
    let filter = match args.str_or("filter", "")? {
        "named" => VariablesFilter::Named,
        "indexed" => VariablesFilter::Indexed,
        _ => VariablesFilter::Both,
    };
    let start = args.i64_or("start", 0)?;
    let count = args.i64_or("count", 0)?;
    let variables = ctx.engine.variables(reference, filter, start, count)?;
    Ok(json!({ "variables": variables }))
}

fn evaluate(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let expression = args.str("expression")?;
    let frame_id = match args.i64_opt("frameId")? {
        Some(frame_id) => frame_id,
        None => ctx
            .engine
            .frame_id(ctx.engine.last_stopped_thread_id(), 0),
    };

    let variable = ctx.engine.evaluate(frame_id, expression)?;
    let mut body = json!({
        "result": variable.value,
        "type": variable.type_field,
        "variablesReference": variable.variables_reference,
    });
    if variable.variables_reference > 0 {
        body["namedVariables"] = json!(variable.named_variables);
    }
    Ok(body)
}

fn attach(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let pid = match args.get("processId") {
        Some(Value::String(text)) => text.trim().parse::<i64>().map_err(|e| {
            CommandError::invalid_argument(format!("Invalid processId '{}': {}", text, e))
        })?,
        Some(Value::Number(number)) => number.as_i64().ok_or_else(|| {
            CommandError::invalid_argument(format!("Invalid processId {}", number))
        })?,
        Some(other) => {
            return Err(CommandError::invalid_argument(format!(
                "processId must be a string or a number, found {}",
                other
            )));
        }
        None => return Err(CommandError::invalid_argument("Missing argument 'processId'")),
    };

    ctx.engine.attach(pid)?;
    Ok(json!({}))
}

fn set_variable(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let name = args.str("name")?;
    let value = args.str("value")?;
    let reference = args.i64("variablesReference")?;
    let value = ctx.engine.set_variable(name, value, reference)?;
    Ok(json!({ "value": value }))
}

fn set_function_breakpoints(ctx: &CommandContext<'_>, args: &Arguments<'_>) -> CommandResult {
    let requested = args
        .array("breakpoints")?
        .iter()
        .map(|entry| {
            let entry = Arguments::new(entry);
            let mut breakpoint = parse_function_name(entry.str("name")?);
            breakpoint.condition = entry.str_or("condition", "")?.to_owned();
            Ok(breakpoint)
        })
        .collect::<Result<Vec<_>, CommandError>>()?;

    let breakpoints = ctx.engine.set_function_breakpoints(&requested)?;
    Ok(json!({ "breakpoints": breakpoints }))
}

/// Splits `[module!]name[(params)]` on the first `!` and the first balanced parenthesis group.
pub fn parse_function_name(qualified: &str) -> FunctionBreakpoint {
    let (module, rest) = qualified.split_once('!').unwrap_or(("", qualified));

    let Some(open) = rest.find('(') else {
        return FunctionBreakpoint {
            module: module.to_owned(),
            name: rest.to_owned(),
            ..Default::default()
        };
    };

    let mut depth = 0usize;
    let mut end = rest.len();
    for (offset, c) in rest[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    end = open + offset + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    FunctionBreakpoint {
        module: module.to_owned(),
        name: rest[..open].to_owned(),
        params: rest[open..end].to_owned(),
        condition: String::new(),
    }
}
