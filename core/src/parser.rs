//! Contract for the argument-parsing collaborator.

use thiserror::Error;

use crate::tree::CommandNode;
use crate::Value;

/// Raw option values and subcommand selection produced by a parser.
///
/// Values are keyed by attribute name and still unconverted; the lifecycle
/// feeds each one through the option's write accessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArguments {
    pub values: Vec<(String, Value)>,
    /// Subcommand token, resolved to the child's canonical name.
    pub subcommand: Option<String>,
    /// Arguments left for the subcommand.
    pub remaining: Vec<String>,
}

/// Parser-level interruption of the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Malformed input.
    #[error("{0}")]
    Usage(String),
    /// The user asked for help; carries the rendered help text.
    #[error("help requested")]
    Help(String),
}

/// Tokenizes raw arguments against a command node.
pub trait ArgumentParser {
    fn parse(&self, node: &CommandNode, args: &[String]) -> Result<ParsedArguments, ParseError>;
}
