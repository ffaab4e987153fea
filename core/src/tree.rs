//! Subcommand tree with conflict-aware registration.
//!
//! Every command type owns an ordered [`Subcommands`] list. Registering a
//! name that is already taken (by canonical name or alias) is a
//! configuration error; replacing a child on purpose goes through
//! [`Subcommands::override_with`], which removes before it inserts.
//!
//! # Examples
//!
//! ```
//! use cmdkit_core::*;
//!
//! let x = CommandKind::builder("ClassX").build().unwrap();
//! let y = CommandKind::builder("ClassY").build().unwrap();
//!
//! let mut subcommands = Subcommands::new("Root");
//! subcommands.register("list", "List things", x).unwrap();
//!
//! let err = subcommands.register("list", "List things", y.clone()).unwrap_err();
//! assert_eq!(err.to_string(), "can't replace subcommand list (ClassX) with list (ClassY)");
//!
//! subcommands.override_with("list", "List things", y).unwrap();
//! assert_eq!(subcommands.find("list").unwrap().kind().type_name(), "ClassY");
//! ```

use std::sync::Arc;

use crate::error::{ConfigurationError, Result};
use crate::logging::CommandLogger;
use crate::CommandKind;

/// One command in the tree: invocation name, description, type, children.
#[derive(Debug, Clone)]
pub struct CommandNode {
    name: String,
    aliases: Vec<String>,
    description: String,
    kind: Arc<CommandKind>,
    children: Subcommands,
}

impl CommandNode {
    /// Creates a node; its children start as a copy of the type's declared
    /// subcommands.
    pub fn new(name: &str, description: &str, kind: Arc<CommandKind>) -> Self {
        let children = kind.subcommands().clone();
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            description: description.to_string(),
            kind,
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Adds an alternative invocation name.
    pub fn add_alias(&mut self, alias: &str) -> &mut Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &Arc<CommandKind> {
        &self.kind
    }

    pub fn children(&self) -> &Subcommands {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Subcommands {
        &mut self.children
    }

    /// Whether `name` is this node's canonical name or one of its aliases.
    pub fn is_called(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Finds a direct child by name or alias.
    pub fn find(&self, name: &str) -> Option<&CommandNode> {
        self.children.find(name)
    }

    /// Walks down the tree following `path`.
    pub fn find_path(&self, path: &[&str]) -> Option<&CommandNode> {
        path.iter()
            .try_fold(self, |node, segment| node.children.find(segment))
    }

    /// Registers a child under this node.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        kind: Arc<CommandKind>,
    ) -> Result<&mut CommandNode> {
        self.children.register(name, description, kind)
    }
}

/// Ordered name → command mapping owned by one command.
#[derive(Debug, Clone, Default)]
pub struct Subcommands {
    owner: String,
    nodes: Vec<CommandNode>,
}

impl Subcommands {
    /// Creates an empty list; `owner` names the declaring type in log lines.
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            nodes: Vec::new(),
        }
    }

    /// Inserts a new child, refusing names that are already taken.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::CommandConflict`] naming both the
    /// registered and the incoming type when `name` already matches a child.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        kind: Arc<CommandKind>,
    ) -> Result<&mut CommandNode> {
        if let Some(existing) = self.find(name) {
            return Err(ConfigurationError::CommandConflict {
                name: name.to_string(),
                existing: existing.kind.type_name().to_string(),
                incoming: kind.type_name().to_string(),
            });
        }
        let index = self.nodes.len();
        self.nodes.push(CommandNode::new(name, description, kind));
        Ok(&mut self.nodes[index])
    }

    /// Replaces whatever is registered under `name`.
    ///
    /// The removal step always runs and is always logged before the creation,
    /// also when nothing was registered under `name`.
    pub fn override_with(
        &mut self,
        name: &str,
        description: &str,
        kind: Arc<CommandKind>,
    ) -> Result<&mut CommandNode> {
        let logger = self.logger();
        if self.remove(name) == 0 {
            logger.info(&format!("subcommand {name} (none) was removed."));
        }
        let incoming = kind.type_name().to_string();
        let node = self.register(name, description, kind)?;
        logger.info(&format!("subcommand {name} ({incoming}) was created."));
        Ok(node)
    }

    /// Removes every child matching `name`, logging each removal.
    ///
    /// Returns how many children were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let logger = self.logger();
        let before = self.nodes.len();
        self.nodes.retain(|node| {
            if node.is_called(name) {
                logger.info(&format!(
                    "subcommand {name} ({}) was removed.",
                    node.kind.type_name()
                ));
                false
            } else {
                true
            }
        });
        before - self.nodes.len()
    }

    /// Child whose canonical name or alias matches `name`.
    pub fn find(&self, name: &str) -> Option<&CommandNode> {
        self.nodes.iter().find(|node| node.is_called(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut CommandNode> {
        self.nodes.iter_mut().find(|node| node.is_called(name))
    }

    /// Registers every command type of `namespace` under its own declared
    /// name and description, in namespace order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnnamedCommand`] for a type without a
    /// command name, or a conflict error from [`register`](Self::register).
    pub fn autoload(&mut self, namespace: &Namespace) -> Result<()> {
        for kind in namespace.commands() {
            let name = kind
                .command_name()
                .ok_or_else(|| ConfigurationError::UnnamedCommand(kind.type_name().to_string()))?
                .to_string();
            let description = kind.description().unwrap_or_default().to_string();
            self.register(&name, &description, Arc::clone(kind))?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandNode> {
        self.nodes.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn logger(&self) -> CommandLogger {
        CommandLogger::new(&self.owner)
    }
}

/// A group of command types enumerated together by
/// [`Subcommands::autoload`].
///
/// Each type is held once; pushing the same type again is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    name: String,
    commands: Vec<Arc<CommandKind>>,
}

impl Namespace {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, kind: Arc<CommandKind>) -> &mut Self {
        if !self.commands.iter().any(|k| Arc::ptr_eq(k, &kind)) {
            self.commands.push(kind);
        }
        self
    }

    pub fn commands(&self) -> &[Arc<CommandKind>] {
        &self.commands
    }
}
