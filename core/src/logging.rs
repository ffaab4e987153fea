//! Logger handle used by commands and the registry.

use std::fmt::Debug;

use tracing::{debug, error, info, warn};

use crate::CommandKind;

/// Named logger wrapper over the `tracing` facade.
///
/// Built once per command instance; every capability (including
/// [`watch`](CommandLogger::watch)) is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLogger {
    name: String,
}

impl CommandLogger {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Logger named after a command type.
    pub fn for_kind(kind: &CommandKind) -> Self {
        Self::new(kind.type_name())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self, message: &str) {
        info!(logger = %self.name, "{message}");
    }

    pub fn debug(&self, message: &str) {
        debug!(logger = %self.name, "{message}");
    }

    pub fn warn(&self, message: &str) {
        warn!(logger = %self.name, "{message}");
    }

    pub fn error(&self, message: &str) {
        error!(logger = %self.name, "{message}");
    }

    /// Logs a pretty-printed value under `label` at debug level.
    pub fn watch(&self, label: &str, value: &dyn Debug) {
        debug!(logger = %self.name, "{label}: {value:#?}");
    }
}
