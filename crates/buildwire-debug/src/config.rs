//! Configuration file loading.

#![allow(missing_docs)]

use std::path::Path;

use buildwire_report::config::ReportSection;
use buildwire_report::ReporterConfig;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::DebugError;

/// Build property carrying the control-channel port.
pub const DEBUG_PORT_PROPERTY: &str = "buildwire.debug.port";

const DEFAULT_BIND: &str = "127.0.0.1";

#[derive(Debug, Clone)]
pub struct DebugConfig {
    pub report: ReporterConfig,
    pub port_property: SmolStr,
    /// Address the control listener binds to.
    pub bind_host: SmolStr,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            report: ReporterConfig::default(),
            port_property: SmolStr::new(DEBUG_PORT_PROPERTY),
            bind_host: SmolStr::new(DEFAULT_BIND),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    report: ReportSection,
    #[serde(default)]
    debug: DebugSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DebugSection {
    port_property: Option<String>,
    bind: Option<String>,
}

impl DebugConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DebugError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            DebugError::InvalidConfig(format!("read {}: {err}", path.display()).into())
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DebugError> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|err| DebugError::InvalidConfig(err.to_string().into()))?;
        let defaults = Self::default();
        let bind_host = match file.debug.bind {
            Some(bind) if bind.trim().is_empty() => {
                return Err(DebugError::InvalidConfig("debug.bind is empty".into()));
            }
            Some(bind) => SmolStr::new(bind.trim()),
            None => defaults.bind_host,
        };
        Ok(Self {
            report: ReporterConfig::from_section(file.report)?,
            port_property: file
                .debug
                .port_property
                .map_or(defaults.port_property, SmolStr::from),
            bind_host,
        })
    }
}
