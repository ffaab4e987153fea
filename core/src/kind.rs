//! Command types.
//!
//! A [`CommandKind`] is everything declared about a command before any
//! instance runs: name and description, the full option list, output fields,
//! validation block, exception-handler scopes, declared subcommands and the
//! factory for its implementation. It is assembled once by a
//! [`CommandKindBuilder`] and immutable afterwards.
//!
//! Inheritance is an explicit copy. [`CommandKindBuilder::extends`] snapshots
//! the parent's option list and output definition at that moment; nothing the
//! child declares later reaches back into the parent.
//!
//! # Examples
//!
//! ```
//! use cmdkit_core::*;
//!
//! let base = CommandKind::builder("Base")
//!     .option(OptionDefinition::new(&["--id"], ValueType::Number, "Id"))
//!     .output(|dsl| {
//!         dsl.field("id", "Id", FieldType::Id);
//!     })
//!     .build()
//!     .unwrap();
//!
//! let info = CommandKind::builder("Info")
//!     .extends(&base)
//!     .option(OptionDefinition::new(&["--name"], ValueType::String, "Name"))
//!     .output(|dsl| {
//!         dsl.field("name", "Name", FieldType::Text);
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(info.output_definition().keys(), vec!["id", "name"]);
//! assert_eq!(base.output_definition().keys(), vec!["id"]);
//! assert_eq!(info.options().len(), 2);
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::Result;
use crate::handler::{ExceptionHandler, Scope};
use crate::lifecycle::{Command, DefaultCommand};
use crate::option::OptionDefinition;
use crate::output::{OutputDefinition, OutputDsl, OutputField};
use crate::tree::{Namespace, Subcommands};
use crate::validate::{ValidationError, Validator, validate_switches};

/// Creates a fresh implementation for each invocation of a command type.
pub type CommandFactory = Arc<dyn Fn() -> Box<dyn Command> + Send + Sync>;

/// Validation block run against the resolved options after parsing.
pub type ValidationBlock =
    Arc<dyn Fn(&Validator<'_>) -> std::result::Result<(), ValidationError> + Send + Sync>;

/// An immutable command type.
pub struct CommandKind {
    type_name: String,
    command_name: Option<String>,
    description: Option<String>,
    options: Vec<OptionDefinition>,
    output_base: OutputDefinition,
    output_declarations: Vec<Vec<OutputField>>,
    output_definition: OnceLock<OutputDefinition>,
    validation: Option<ValidationBlock>,
    scopes: Vec<Scope>,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
    subcommands: Subcommands,
    factory: CommandFactory,
}

impl CommandKind {
    pub fn builder(type_name: &str) -> CommandKindBuilder {
        CommandKindBuilder::new(type_name)
    }

    /// Name of the type, used in log lines and conflict errors.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared (or inherited) name to register the type under.
    pub fn command_name(&self) -> Option<&str> {
        self.command_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Inherited options followed by the type's own, in declaration order.
    pub fn options(&self) -> &[OptionDefinition] {
        &self.options
    }

    /// Finds an option by attribute name or switch.
    pub fn option(&self, name: &str) -> Option<&OptionDefinition> {
        self.options.iter().find(|o| o.matches(name))
    }

    /// The type's output definition, computed on first use.
    ///
    /// Starts from the copy of the parent's definition taken by
    /// [`CommandKindBuilder::extends`], then appends every declared field set
    /// in declaration order.
    pub fn output_definition(&self) -> &OutputDefinition {
        self.output_definition.get_or_init(|| {
            let mut definition = self.output_base.clone();
            for fields in &self.output_declarations {
                definition.append(fields.iter().cloned());
            }
            definition
        })
    }

    pub fn validation_block(&self) -> Option<&ValidationBlock> {
        self.validation.as_ref()
    }

    /// Enclosing scopes, outermost first.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn exception_handler(&self) -> Option<&Arc<dyn ExceptionHandler>> {
        self.exception_handler.as_ref()
    }

    /// The fully-qualified nesting path: enclosing scopes, then the type's
    /// own scope.
    pub fn qualified_scopes(&self) -> Vec<Scope> {
        let mut own = Scope::new(&self.type_name);
        if let Some(handler) = &self.exception_handler {
            own = own.with_exception_handler(Arc::clone(handler));
        }
        let mut scopes = self.scopes.clone();
        scopes.push(own);
        scopes
    }

    /// Subcommands declared on the type itself.
    pub fn subcommands(&self) -> &Subcommands {
        &self.subcommands
    }

    /// Creates a new implementation instance.
    pub fn instantiate(&self) -> Box<dyn Command> {
        (self.factory)()
    }
}

impl fmt::Debug for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandKind")
            .field("type_name", &self.type_name)
            .field("command_name", &self.command_name)
            .field("options", &self.options.len())
            .field("scopes", &self.scopes)
            .field("subcommands", &self.subcommands.names())
            .finish()
    }
}

/// Collects a command type's declarations.
pub struct CommandKindBuilder {
    type_name: String,
    command_name: Option<String>,
    description: Option<String>,
    options: Vec<OptionDefinition>,
    output_base: OutputDefinition,
    output_declarations: Vec<Vec<OutputField>>,
    validation: Option<ValidationBlock>,
    scopes: Vec<Scope>,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
    subcommands: Subcommands,
    factory: Option<CommandFactory>,
}

impl CommandKindBuilder {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            command_name: None,
            description: None,
            options: Vec::new(),
            output_base: OutputDefinition::new(),
            output_declarations: Vec::new(),
            validation: None,
            scopes: Vec::new(),
            exception_handler: None,
            subcommands: Subcommands::new(type_name),
            factory: None,
        }
    }

    /// Derives from `parent`.
    ///
    /// Copies the parent's options (placed before any of this type's own),
    /// a deep copy of its output definition as the base, and its command
    /// name, implementation and exception handler unless this type sets its
    /// own. Enclosing scopes are where a type is declared, so they are not
    /// copied.
    pub fn extends(mut self, parent: &CommandKind) -> Self {
        let mut options = parent.options.clone();
        options.append(&mut self.options);
        self.options = options;
        self.output_base = parent.output_definition().clone();
        if self.command_name.is_none() {
            self.command_name = parent.command_name.clone();
        }
        if self.factory.is_none() {
            self.factory = Some(Arc::clone(&parent.factory));
        }
        if self.exception_handler.is_none() {
            self.exception_handler = parent.exception_handler.clone();
        }
        self
    }

    pub fn command_name(mut self, name: &str) -> Self {
        self.command_name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Declares an option.
    pub fn option(mut self, option: OptionDefinition) -> Self {
        self.options.push(option);
        self
    }

    /// Declares output fields through the DSL.
    pub fn output(mut self, block: impl FnOnce(&mut OutputDsl)) -> Self {
        self.output_declarations.push(OutputDsl::build(block));
        self
    }

    /// Merges an externally supplied field set.
    pub fn merge_output(mut self, definition: &OutputDefinition) -> Self {
        self.output_declarations.push(definition.fields().to_vec());
        self
    }

    pub fn validate_options(
        mut self,
        block: impl Fn(&Validator<'_>) -> std::result::Result<(), ValidationError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.validation = Some(Arc::new(block));
        self
    }

    /// Declares the type inside `scope`; call outermost first.
    pub fn within(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    pub fn exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    /// Sets the implementation factory.
    pub fn implementation(mut self, factory: impl Fn() -> Box<dyn Command> + Send + Sync + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Declares a subcommand.
    pub fn subcommand(mut self, name: &str, description: &str, kind: Arc<CommandKind>) -> Result<Self> {
        self.subcommands.register(name, description, kind)?;
        Ok(self)
    }

    /// Declares a subcommand, replacing any earlier one with the same name.
    pub fn override_subcommand(
        mut self,
        name: &str,
        description: &str,
        kind: Arc<CommandKind>,
    ) -> Result<Self> {
        self.subcommands.override_with(name, description, kind)?;
        Ok(self)
    }

    pub fn remove_subcommand(mut self, name: &str) -> Self {
        self.subcommands.remove(name);
        self
    }

    /// Declares every type of `namespace` as a subcommand.
    pub fn autoload(mut self, namespace: &Namespace) -> Result<Self> {
        self.subcommands.autoload(namespace)?;
        Ok(self)
    }

    /// Validates the option switches and freezes the type.
    ///
    /// # Errors
    ///
    /// Returns a switch-related [`ConfigurationError`](crate::ConfigurationError)
    /// when any option is malformed or two options share a switch.
    pub fn build(self) -> Result<Arc<CommandKind>> {
        validate_switches(&self.type_name, &self.options)?;
        let factory: CommandFactory = match self.factory {
            Some(factory) => factory,
            None => Arc::new(|| Box::new(DefaultCommand) as Box<dyn Command>),
        };
        Ok(Arc::new(CommandKind {
            type_name: self.type_name,
            command_name: self.command_name,
            description: self.description,
            options: self.options,
            output_base: self.output_base,
            output_declarations: self.output_declarations,
            output_definition: OnceLock::new(),
            validation: self.validation,
            scopes: self.scopes,
            exception_handler: self.exception_handler,
            subcommands: self.subcommands,
            factory,
        }))
    }
}
