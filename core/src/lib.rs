//! Command tree, option registry and execution lifecycle for tree-structured
//! command-line tools.
//!
//! This crate is the configuration and dispatch layer every command of a
//! tool is built on:
//!
//! - [`CommandKind`]: an immutable command type with its options, output fields,
//!   validation block, exception handler scope and implementation factory.
//! - [`OptionDefinition`]: one CLI-bindable attribute with its switches,
//!   declared [`ValueType`], conversion and optional context target.
//! - [`OutputDefinition`]: ordered output fields, inherited from the parent
//!   command type by copy and extended by the child.
//! - [`Subcommands`] / [`CommandNode`]: the subcommand tree with
//!   conflict-aware registration, override, removal and autoload.
//! - [`resolve_exception_handler`]: nearest-scope lookup of the strategy that
//!   turns an execution fault into an exit code.
//! - [`Session`] / [`CommandInstance`]: the parse → validate → execute →
//!   exit-code lifecycle.
//!
//! Argument tokenizing and output rendering are collaborators behind the
//! [`ArgumentParser`] and [`OutputRenderer`] traits. With the default `clap`
//! feature, [`ClapParser`] builds a `clap` command from a node on the fly.
//!
//! # Example
//!
//! ```
//! use cmdkit_core::*;
//!
//! let list = CommandKind::builder("UserList")
//!     .command_name("list")
//!     .description("List users")
//!     .option(OptionDefinition::new(&["--search"], ValueType::String, "Filter by login"))
//!     .output(|dsl| {
//!         dsl.field("id", "Id", FieldType::Id);
//!         dsl.field("login", "Login", FieldType::Text);
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut namespace = Namespace::new("user");
//! namespace.push(list);
//!
//! let user = CommandKind::builder("User")
//!     .autoload(&namespace)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let root = CommandNode::new("tool", "Example tool", user);
//! assert_eq!(root.find("list").unwrap().kind().type_name(), "UserList");
//! ```

#[cfg(feature = "clap")]
mod clap_parser;
mod config;
mod context;
mod error;
pub mod exit_code;
mod handler;
mod kind;
mod lifecycle;
mod logging;
mod option;
mod output;
mod parser;
mod tree;
mod types;
mod validate;

#[cfg(feature = "clap")]
pub use clap_parser::ClapParser;
pub use config::{PASSWORD_SUFFIX, Settings};
pub use context::{ExecutionContext, PathEntry};
pub use error::{ConfigurationError, ConversionError, InvariantViolation, Result};
pub use handler::{DefaultExceptionHandler, ExceptionHandler, Scope, resolve_exception_handler};
pub use kind::{CommandFactory, CommandKind, CommandKindBuilder, ValidationBlock};
pub use lifecycle::{
    Command, CommandContext, CommandInstance, Completion, DefaultCommand, Interrupt,
    LifecycleState, Session,
};
pub use logging::CommandLogger;
pub use option::{
    Conversion, OptionAccessor, OptionDefinition, OptionMap, OptionValues, REDACTED_MASK,
    ValueFormatter, format_snapshot, redact_snapshot,
};
pub use output::{
    FieldType, OutputDefinition, OutputDsl, OutputField, OutputRenderer, interpolate,
};
pub use parser::{ArgumentParser, ParseError, ParsedArguments};
pub use tree::{CommandNode, Namespace, Subcommands};
pub use types::{Value, ValueType};
pub use validate::{BoundOption, Constraint, ValidationError, ValidationOutcome, Validator};
