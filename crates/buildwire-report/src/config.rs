//! Reporter configuration.

#![allow(missing_docs)]

use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::channel::RetryPolicy;
use crate::error::ReportError;
use crate::event::Priority;

/// Build property carrying the event-channel port.
pub const CONNECT_PORT_PROPERTY: &str = "buildwire.connect.port";
/// Build property carrying the identifier sent as the first message.
pub const PROCESS_ID_PROPERTY: &str = "buildwire.process.id";
/// Platform property never included in property snapshots.
pub const LINE_SEPARATOR_PROPERTY: &str = "line.separator";

const DEFAULT_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub host: SmolStr,
    pub port_property: SmolStr,
    pub process_id_property: SmolStr,
    pub message_output_level: Priority,
    /// Non-interactive echo mode: task output is sent as plain messages.
    pub emacs_mode: bool,
    pub retry: RetryPolicy,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            host: SmolStr::new(DEFAULT_HOST),
            port_property: SmolStr::new(CONNECT_PORT_PROPERTY),
            process_id_property: SmolStr::new(PROCESS_ID_PROPERTY),
            message_output_level: Priority::Info,
            emacs_mode: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// `[report]` table as written in a config file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSection {
    pub host: Option<String>,
    pub port_property: Option<String>,
    pub process_id_property: Option<String>,
    pub level: Option<String>,
    pub emacs: Option<bool>,
    pub connect_attempts: Option<u32>,
    pub connect_backoff_ms: Option<u64>,
}

impl ReporterConfig {
    /// Validate a `[report]` table, filling unset keys with defaults.
    pub fn from_section(section: ReportSection) -> Result<Self, ReportError> {
        let defaults = Self::default();
        let host = match section.host {
            Some(host) if host.trim().is_empty() => {
                return Err(ReportError::InvalidConfig("report.host is empty".into()));
            }
            Some(host) => SmolStr::new(host.trim()),
            None => defaults.host,
        };
        let message_output_level = section
            .level
            .as_deref()
            .map(Priority::parse)
            .transpose()?
            .unwrap_or(defaults.message_output_level);
        let attempts = section.connect_attempts.unwrap_or(defaults.retry.attempts);
        if attempts == 0 {
            return Err(ReportError::InvalidConfig(
                "report.connect_attempts must be at least 1".into(),
            ));
        }
        let backoff = section
            .connect_backoff_ms
            .map_or(defaults.retry.backoff, Duration::from_millis);
        Ok(Self {
            host,
            port_property: section
                .port_property
                .map_or(defaults.port_property, SmolStr::from),
            process_id_property: section
                .process_id_property
                .map_or(defaults.process_id_property, SmolStr::from),
            message_output_level,
            emacs_mode: section.emacs.unwrap_or(defaults.emacs_mode),
            retry: RetryPolicy { attempts, backoff },
        })
    }

    /// Parse a TOML document holding only reporter keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ReportError> {
        let section: ReportSection = toml::from_str(text)
            .map_err(|err| ReportError::InvalidConfig(format!("report config: {err}").into()))?;
        Self::from_section(section)
    }
}
