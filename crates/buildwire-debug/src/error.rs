//! Debug extension errors.

#![allow(missing_docs)]

use buildwire_report::ReportError;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by the control channel, its configuration and build scripts.
#[derive(Debug, Error)]
pub enum DebugError {
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Accept, read or write failure on the control connection.
    #[error("control channel: {0}")]
    Io(#[from] std::io::Error),

    /// A recognised command with an argument that does not parse.
    #[error("malformed control command '{0}'")]
    MalformedCommand(SmolStr),

    #[error("invalid config: {0}")]
    InvalidConfig(SmolStr),

    #[error("invalid build script: {0}")]
    InvalidScript(SmolStr),
}
