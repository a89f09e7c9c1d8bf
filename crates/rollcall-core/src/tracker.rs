//! Names already marked present in the current session.

use std::collections::HashSet;

/// Grows monotonically for the lifetime of one run; never persisted.
#[derive(Debug, Default)]
pub struct SessionTracker {
    marked: HashSet<String>,
    order: Vec<String>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_marked(&self, name: &str) -> bool {
        self.marked.contains(name)
    }

    /// Mark `name` present. Returns false if it was already marked.
    pub fn mark(&mut self, name: &str) -> bool {
        if !self.marked.insert(name.to_string()) {
            return false;
        }
        self.order.push(name.to_string());
        true
    }

    /// Marked names in the order they were first seen.
    pub fn marked(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
