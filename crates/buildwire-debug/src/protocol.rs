//! Control-channel protocol.
//! - ControlCommand: client -> build commands, matched by prefix
//! - SuspendReason/ResumeReason: build -> client state notifications
//! - markers: debug milestones sent on the event channel

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

use crate::error::DebugError;

pub const STEP: &str = "step";
pub const SUSPEND: &str = "suspend";
pub const RESUME: &str = "resume";
pub const TERMINATE: &str = "terminate";
pub const STACK: &str = "stack";
pub const ADD_BREAKPOINT: &str = "add_breakpoint";
pub const REMOVE_BREAKPOINT: &str = "remove_breakpoint";
pub const PROPERTIES: &str = "properties";

pub const SUSPENDED: &str = "suspended ";
pub const RESUMED: &str = "resumed ";

pub const REASON_BREAKPOINT: &str = "breakpoint";
pub const REASON_STEP: &str = "step";
pub const REASON_CLIENT: &str = "client";

pub const BUILD_STARTED: &str = "build_started";
pub const BUILD_FINISHED: &str = "build_finished";
pub const TARGET_STARTED: &str = "target_started";
pub const TARGET_FINISHED: &str = "target_finished";
pub const TASK_STARTED: &str = "task_started";
pub const TASK_FINISHED: &str = "task_finished";

/// A command read from the control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Step,
    Suspend,
    Resume,
    Terminate,
    Stack,
    AddBreakpoint(u32),
    RemoveBreakpoint(u32),
    Properties,
}

impl ControlCommand {
    /// Decode one line. Unknown prefixes yield `Ok(None)`; a breakpoint
    /// command whose line number does not parse is an error.
    pub fn parse(line: &str) -> Result<Option<Self>, DebugError> {
        let command = if line.starts_with(STEP) {
            Self::Step
        } else if line.starts_with(SUSPEND) {
            Self::Suspend
        } else if line.starts_with(RESUME) {
            Self::Resume
        } else if line.starts_with(TERMINATE) {
            Self::Terminate
        } else if line.starts_with(STACK) {
            Self::Stack
        } else if let Some(rest) = line.strip_prefix(ADD_BREAKPOINT) {
            Self::AddBreakpoint(parse_line_number(line, rest)?)
        } else if let Some(rest) = line.strip_prefix(REMOVE_BREAKPOINT) {
            Self::RemoveBreakpoint(parse_line_number(line, rest)?)
        } else if line.starts_with(PROPERTIES) {
            Self::Properties
        } else {
            return Ok(None);
        };
        Ok(Some(command))
    }
}

fn parse_line_number(line: &str, rest: &str) -> Result<u32, DebugError> {
    rest.trim()
        .parse()
        .map_err(|_| DebugError::MalformedCommand(SmolStr::new(line)))
}

/// Why the build thread is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    Breakpoint(u32),
    Step,
    ClientRequest,
}

impl fmt::Display for SuspendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Breakpoint(line) => write!(f, "{REASON_BREAKPOINT} {line}"),
            Self::Step => f.write_str(REASON_STEP),
            Self::ClientRequest => f.write_str(REASON_CLIENT),
        }
    }
}

/// Why the build thread was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeReason {
    Step,
    ClientRequest,
}

impl fmt::Display for ResumeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => f.write_str(REASON_STEP),
            Self::ClientRequest => f.write_str(REASON_CLIENT),
        }
    }
}

#[must_use]
pub fn encode_suspended(reason: SuspendReason) -> String {
    format!("{SUSPENDED}{reason}")
}

#[must_use]
pub fn encode_resumed(reason: ResumeReason) -> String {
    format!("{RESUMED}{reason}")
}
