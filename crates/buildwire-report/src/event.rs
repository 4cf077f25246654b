//! Build lifecycle events as delivered by the build execution engine.

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::ReportError;

/// Message severity, ordered from most to least important.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Errors.
    Error = 0,
    /// Warnings.
    Warn = 1,
    /// Normal progress output.
    #[default]
    Info = 2,
    /// Verbose output.
    Verbose = 3,
    /// Debug output.
    Debug = 4,
    /// Project help text. Always passes the output threshold.
    ProjectHelp = 5,
}

impl Priority {
    /// Numeric level used on the wire.
    #[must_use]
    pub const fn level(self) -> i32 {
        self as i32
    }

    /// Parse an output threshold (`error`, `warn`, `info`, `verbose`,
    /// `debug`). `project_help` is rejected: as a threshold it would let
    /// every message through.
    pub fn parse(text: &str) -> Result<Self, ReportError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "error" | "err" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "verbose" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            _ => Err(ReportError::InvalidConfig(
                format!("invalid priority '{text}'").into(),
            )),
        }
    }

    /// Whether a message of this priority is emitted at `threshold`.
    #[must_use]
    pub fn passes(self, threshold: Priority) -> bool {
        self <= threshold || self == Self::ProjectHelp
    }
}

/// Position of a task or target in its build file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: SmolStr,
    pub line: u32,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: impl Into<SmolStr>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A build target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: SmolStr,
    pub location: Option<SourceLocation>,
}

impl Target {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// A task running inside a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: SmolStr,
    pub location: Option<SourceLocation>,
    /// Name of the owning target, if known.
    pub target: Option<SmolStr>,
}

impl Task {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            location: None,
            target: None,
        }
    }

    #[must_use]
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn in_target(mut self, target: impl Into<SmolStr>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Source line of the task, if it has a location.
    #[must_use]
    pub fn line(&self) -> Option<u32> {
        self.location.as_ref().map(|location| location.line)
    }
}

/// What produced an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOrigin {
    /// The build as a whole, or output with no enclosing target.
    Build,
    Target(Target),
    Task(Task),
}

/// Failure reported through the build's own error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildFailure {
    Failed(String),
    /// Internal sentinel raised when reporting is disabled. Never reported.
    ReportingDisabled,
}

/// Shared handle to the running build's name and property table.
///
/// Clones observe the same table, so the control reader thread sees
/// properties set by the build thread.
#[derive(Debug, Clone, Default)]
pub struct Project {
    name: SmolStr,
    properties: Arc<RwLock<IndexMap<SmolStr, SmolStr>>>,
}

impl Project {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            properties: Arc::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_property(&self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        self.properties.write().insert(name.into(), value.into());
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<SmolStr> {
        self.properties.read().get(name).cloned()
    }

    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.read().len()
    }

    /// Copy of the property table in insertion order.
    #[must_use]
    pub fn properties(&self) -> IndexMap<SmolStr, SmolStr> {
        self.properties.read().clone()
    }
}

/// A single lifecycle callback payload.
#[derive(Debug, Clone)]
pub struct BuildEvent {
    pub project: Project,
    pub origin: EventOrigin,
    pub message: Option<String>,
    pub priority: Priority,
    pub failure: Option<BuildFailure>,
}

impl BuildEvent {
    fn with_origin(project: &Project, origin: EventOrigin) -> Self {
        Self {
            project: project.clone(),
            origin,
            message: None,
            priority: Priority::Info,
            failure: None,
        }
    }

    #[must_use]
    pub fn build(project: &Project) -> Self {
        Self::with_origin(project, EventOrigin::Build)
    }

    #[must_use]
    pub fn target(project: &Project, target: Target) -> Self {
        Self::with_origin(project, EventOrigin::Target(target))
    }

    #[must_use]
    pub fn task(project: &Project, task: Task) -> Self {
        Self::with_origin(project, EventOrigin::Task(task))
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>, priority: Priority) -> Self {
        self.message = Some(message.into());
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_failure(mut self, failure: BuildFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    #[must_use]
    pub fn task_ref(&self) -> Option<&Task> {
        match &self.origin {
            EventOrigin::Task(task) => Some(task),
            _ => None,
        }
    }

    #[must_use]
    pub fn target_ref(&self) -> Option<&Target> {
        match &self.origin {
            EventOrigin::Target(target) => Some(target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_help_bypasses_threshold() {
        assert!(Priority::ProjectHelp.passes(Priority::Error));
        assert!(Priority::Warn.passes(Priority::Info));
        assert!(!Priority::Debug.passes(Priority::Info));
    }

    #[test]
    fn project_clones_share_properties() {
        let project = Project::new("demo");
        let view = project.clone();
        project.set_property("a", "1");
        assert_eq!(view.property("a").as_deref(), Some("1"));
        assert_eq!(view.property_count(), 1);
    }

    #[test]
    fn parse_rejects_unknown_priority() {
        assert_eq!(Priority::parse(" Verbose ").unwrap(), Priority::Verbose);
        assert!(Priority::parse("loud").is_err());
    }

    #[test]
    fn project_help_is_not_a_threshold() {
        assert!(matches!(
            Priority::parse("project_help"),
            Err(ReportError::InvalidConfig(_))
        ));
    }
}
