//! Build scripts replayed by the driver.
//!
//! ```toml
//! name = "demo"
//! description = "Sample build"
//! default = "compile"
//!
//! [properties]
//! "buildwire.connect.port" = "4100"
//!
//! [[targets]]
//! name = "compile"
//! description = "Compile the sources"
//!
//! [[targets.tasks]]
//! name = "javac"
//! file = "build.xml"
//! line = 12
//! messages = [{ priority = "info", text = "Compiling 3 files" }]
//! ```

#![allow(missing_docs)]

use std::path::Path;

use buildwire_report::Priority;
use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::DebugError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildScript {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Target run when none is named.
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<SmolStr, SmolStr>,
    #[serde(default)]
    pub targets: Vec<ScriptTarget>,
    /// Reported as the build failure once every target has run.
    #[serde(default)]
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptTarget {
    pub name: String,
    /// Targets with a description are listed as main targets in project help.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub messages: Vec<ScriptMessage>,
    #[serde(default)]
    pub tasks: Vec<ScriptTask>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptTask {
    pub name: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub messages: Vec<ScriptMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptMessage {
    #[serde(default)]
    pub priority: Priority,
    pub text: String,
}

impl BuildScript {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DebugError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            DebugError::InvalidScript(format!("read {}: {err}", path.display()).into())
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DebugError> {
        let script: Self =
            toml::from_str(text).map_err(|err| DebugError::InvalidScript(err.to_string().into()))?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<(), DebugError> {
        if self.name.trim().is_empty() {
            return Err(DebugError::InvalidScript("build name is empty".into()));
        }
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(DebugError::InvalidScript("target name is empty".into()));
            }
            if let Some(task) = target.tasks.iter().find(|task| task.name.trim().is_empty()) {
                return Err(DebugError::InvalidScript(
                    format!("target '{}' has a task without a name (line {:?})", target.name, task.line)
                        .into(),
                ));
            }
        }
        if let Some(default) = &self.default {
            if self.target(default).is_none() {
                return Err(DebugError::InvalidScript(
                    format!("default target '{default}' does not exist").into(),
                ));
            }
        }
        Ok(())
    }

    /// Position of the target named `name`.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<usize> {
        self.targets.iter().position(|target| target.name == name)
    }

    /// Number of tasks across all targets.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.targets.iter().map(|target| target.tasks.len()).sum()
    }
}
