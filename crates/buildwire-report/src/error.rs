//! Reporter errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while setting up or talking to the event listener.
///
/// None of these ever reach the build; the reporter logs them and disables
/// the affected channel.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The port property is missing.
    #[error("property '{0}' is not set")]
    MissingPort(SmolStr),

    /// The port property is not a valid port number.
    #[error("invalid port '{value}' in property '{property}'")]
    InvalidPort { property: SmolStr, value: SmolStr },

    /// Every connection attempt failed.
    #[error("could not connect to {addr} after {attempts} attempts: {source}")]
    ConnectFailed {
        addr: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// The channel was already abandoned.
    #[error("event channel is closed")]
    ChannelClosed,

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    InvalidConfig(SmolStr),
}
