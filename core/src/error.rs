//! Error types for command configuration and execution.
//!
//! Configuration errors surface while a command tree is being assembled and
//! are always fatal at startup. Execution faults raised by command
//! implementations are plain [`anyhow::Error`] values and never appear here.

use thiserror::Error;

use crate::Value;

/// Errors raised while command types and trees are being assembled.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A subcommand name is already taken in the same scope and no override
    /// was requested.
    #[error("can't replace subcommand {name} ({existing}) with {name} ({incoming})")]
    CommandConflict {
        /// The contested subcommand name.
        name: String,
        /// Type name of the command already registered.
        existing: String,
        /// Type name of the command that was being registered.
        incoming: String,
    },

    /// A command type neither declares nor inherits a command name.
    #[error("command type {0} has no command name to register under")]
    UnnamedCommand(String),

    /// An option was declared without any switch.
    #[error("option must define at least one switch")]
    MissingSwitch,

    /// Short switch does not look like `-x`.
    #[error("invalid short switch format: {0}")]
    InvalidShortSwitch(String),

    /// Long switch does not look like `--name`.
    #[error("invalid long switch format: {0}")]
    InvalidLongSwitch(String),

    /// The switch is reserved for help output.
    #[error("switch {0} is reserved")]
    ReservedSwitch(String),

    /// Two options of the same command share a switch.
    #[error("duplicate switch in {command}: {switch}")]
    DuplicateSwitch {
        /// Type name of the declaring command.
        command: String,
        /// The repeated switch.
        switch: String,
    },

    /// Two options of the same command derive the same attribute name.
    #[error("duplicate option attribute in {command}: {attribute}")]
    DuplicateAttribute {
        /// Type name of the declaring command.
        command: String,
        /// The repeated attribute name.
        attribute: String,
    },

    /// Settings file I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Settings YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`ConfigurationError`].
pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// An option's write accessor could not convert the supplied value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("option {option}: {message}")]
pub struct ConversionError {
    /// Primary switch of the option (e.g. `--count`).
    pub option: String,
    /// Human-readable reason.
    pub message: String,
}

/// A command's `execute` produced something other than an exit code.
///
/// This is a defect in the command implementation, never a user-facing
/// failure, so it bypasses exception handlers entirely.
#[derive(Debug, Error)]
#[error("{command}: exit code must be an integer, execute returned {returned}")]
pub struct InvariantViolation {
    /// Type name of the offending command.
    pub command: String,
    /// The value `execute` returned instead.
    pub returned: Value,
}
