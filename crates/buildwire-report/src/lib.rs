//! `buildwire-report` - remote build event reporter.
//!
//! Turns build lifecycle callbacks into newline-terminated text messages on
//! one outbound TCP connection. Events observed before the connection exists
//! are queued and replayed right after the process identifier is sent.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Outbound event channel and connection retry.
pub mod channel;
/// Reporter configuration.
pub mod config;
/// Reporter errors.
pub mod error;
/// Build lifecycle event model.
pub mod event;
mod listener;
/// Event reporter.
pub mod reporter;
/// Event-channel wire encoding.
pub mod wire;

pub use channel::{ConnectionState, Dialer, EventChannel, RetryPolicy, TcpDialer};
pub use config::{
    ReporterConfig, CONNECT_PORT_PROPERTY, LINE_SEPARATOR_PROPERTY, PROCESS_ID_PROPERTY,
};
pub use error::ReportError;
pub use event::{
    BuildEvent, BuildFailure, EventOrigin, Priority, Project, SourceLocation, Target, Task,
};
pub use listener::BuildListener;
pub use reporter::RemoteBuildReporter;
