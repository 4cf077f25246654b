//! `buildwire-debug` - debug control channel for reported builds.
//!
//! Layers an inbound control connection over the event reporter so a client
//! can suspend the build at target and task boundaries, single-step, set
//! line breakpoints, and inspect the current stack and properties.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Line breakpoint set.
pub mod breakpoints;
/// Control connection transport and command reader.
pub mod channel;
/// Debug configuration.
pub mod config;
/// Suspend state shared by the build and reader threads.
pub mod control;
/// Scripted build replay.
pub mod driver;
/// Debug errors.
pub mod error;
/// Control-channel commands and notifications.
pub mod protocol;
/// Event reporter with debug control.
pub mod reporter;
/// Build script model.
pub mod script;
/// Stack and property snapshots.
pub mod snapshot;
/// Process termination seam.
pub mod supervisor;

pub use breakpoints::BreakpointSet;
pub use channel::{ControlChannel, CONTROL_WRITE_TIMEOUT};
pub use config::{DebugConfig, DEBUG_PORT_PROPERTY};
pub use control::{DebugControl, ExecutionPosition, RunState};
pub use driver::{parse_define, BuildDriver, ReplayOutcome, BUILD_SUCCESSFUL};
pub use error::DebugError;
pub use protocol::{ControlCommand, ResumeReason, SuspendReason};
pub use reporter::DebugBuildReporter;
pub use script::BuildScript;
pub use snapshot::{KnownProperties, StackFrame};
pub use supervisor::{ExitProcess, Supervisor, TERMINATED_EXIT_CODE};
