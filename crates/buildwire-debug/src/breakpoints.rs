//! Breakpoint set.

#![allow(missing_docs)]

use indexmap::IndexSet;

/// Line breakpoints. Lines are matched by exact equality; there is no file
/// scoping.
#[derive(Debug, Default, Clone)]
pub struct BreakpointSet {
    lines: IndexSet<u32>,
}

impl BreakpointSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the line was already present.
    pub fn add(&mut self, line: u32) -> bool {
        self.lines.insert(line)
    }

    /// Returns false when the line was not present.
    pub fn remove(&mut self, line: u32) -> bool {
        let removed = self.lines.shift_remove(&line);
        if self.lines.is_empty() {
            self.lines = IndexSet::new();
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, line: u32) -> bool {
        self.lines.contains(&line)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.iter().copied()
    }
}
