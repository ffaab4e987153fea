//! Execution context shared by one invocation chain.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::handler::Scope;
use crate::tree::CommandNode;
use crate::{CommandKind, Value};

/// One command instance on the invocation path.
#[derive(Debug, Clone)]
pub struct PathEntry {
    /// Name the command was invoked under.
    pub name: String,
    /// The command type behind it.
    pub kind: Arc<CommandKind>,
}

impl PathEntry {
    pub fn new(node: &CommandNode) -> Self {
        Self {
            name: node.name().to_string(),
            kind: Arc::clone(node.kind()),
        }
    }
}

/// Mutable record threaded through one invocation: the root-to-current
/// command path and the bag written by options with a context target.
///
/// Entries are only ever appended; nothing resets the context mid-run.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    path: Vec<PathEntry>,
    values: BTreeMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command to the path and returns its depth.
    pub(crate) fn push(&mut self, entry: PathEntry) -> usize {
        self.path.push(entry);
        self.path.len() - 1
    }

    pub fn path(&self) -> &[PathEntry] {
        &self.path
    }

    /// The most recently constructed command.
    pub fn current(&self) -> Option<&PathEntry> {
        self.path.last()
    }

    /// The second-to-last entry of the path.
    pub fn parent_command(&self) -> Option<&PathEntry> {
        self.path.len().checked_sub(2).and_then(|i| self.path.get(i))
    }

    /// Invocation names from the root down, e.g. `["tool", "user", "list"]`.
    pub fn command_line(&self) -> Vec<&str> {
        self.path.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Scopes enclosing the command at `depth`, outermost first.
    ///
    /// Each path entry contributes the scopes its type was declared within,
    /// followed by the type's own scope.
    pub fn scope_chain(&self, depth: usize) -> Vec<Scope> {
        self.path
            .iter()
            .take(depth + 1)
            .flat_map(|entry| entry.kind.qualified_scopes())
            .collect()
    }
}
