//! Stack and property snapshots sent on the control channel.

#![allow(missing_docs)]

use buildwire_report::wire::DELIMITER;
use buildwire_report::LINE_SEPARATOR_PROPERTY;
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::control::ExecutionPosition;
use crate::protocol::{PROPERTIES, STACK};

/// The running task and its enclosing target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub target: SmolStr,
    pub task: Option<SmolStr>,
    pub file: SmolStr,
    pub line: u32,
}

impl StackFrame {
    /// Frame for the current task; `None` when no task runs.
    #[must_use]
    pub fn for_position(position: &ExecutionPosition) -> Option<Self> {
        let task = position.task.as_ref()?;
        let target = position
            .target
            .as_ref()
            .map(|target| target.name.clone())
            .or_else(|| task.target.clone())
            .unwrap_or_default();
        let (file, line) = task
            .location
            .as_ref()
            .map(|location| (location.file.clone(), location.line))
            .unwrap_or_default();
        Some(Self {
            target,
            task: Some(task.name.clone()),
            file,
            line,
        })
    }

    /// `stack,<target>[,<task>],<file>,<line>`
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::from(STACK);
        push_field(&mut out, &self.target);
        if let Some(task) = &self.task {
            push_field(&mut out, task);
        }
        push_field(&mut out, &self.file);
        push_field(&mut out, &self.line.to_string());
        out
    }
}

fn push_field(out: &mut String, field: &str) {
    out.push(DELIMITER);
    out.push_str(field);
}

/// Property table as last sent to the client.
#[derive(Debug, Default, Clone)]
pub struct KnownProperties {
    known: IndexMap<SmolStr, SmolStr>,
}

impl KnownProperties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `properties,[<len>,<name>,<len>,<value>,]*` listing entries whose names
    /// were not in the previous snapshot.
    ///
    /// An unchanged entry count short-circuits to an empty snapshot; value
    /// changes and removals are not detected.
    pub fn snapshot(&mut self, current: &IndexMap<SmolStr, SmolStr>) -> String {
        let mut out = String::from(PROPERTIES);
        out.push(DELIMITER);
        if current.len() == self.known.len() {
            return out;
        }
        for (name, value) in current {
            if name == LINE_SEPARATOR_PROPERTY || self.known.contains_key(name) {
                continue;
            }
            for field in [name.as_str(), value.as_str()] {
                out.push_str(&field.chars().count().to_string());
                out.push(DELIMITER);
                out.push_str(field);
                out.push(DELIMITER);
            }
        }
        self.known = current.clone();
        out
    }
}
