//! [`ArgumentParser`] backed by `clap`.
//!
//! The `clap::Command` is rebuilt from the node on every call: one argument
//! per declared option and one subcommand per child. A child subcommand only
//! swallows its raw arguments; the lifecycle parses them again against the
//! child's own node once it is dispatched.

use clap::builder::PossibleValuesParser;
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};

use crate::option::OptionDefinition;
use crate::parser::{ArgumentParser, ParseError, ParsedArguments};
use crate::tree::CommandNode;
use crate::{Value, ValueType};

const REST: &str = "__rest";
const NEGATION_PREFIX: &str = "[no-]";

/// Parses arguments with a `clap::Command` built from the node.
///
/// # Examples
///
/// ```
/// use cmdkit_core::*;
///
/// let kind = CommandKind::builder("List")
///     .option(OptionDefinition::new(&["-s", "--search"], ValueType::String, "Filter"))
///     .build()
///     .unwrap();
/// let node = CommandNode::new("list", "List things", kind);
///
/// let args: Vec<String> = vec!["-s".into(), "admin".into()];
/// let parsed = ClapParser::new().parse(&node, &args).unwrap();
/// assert_eq!(parsed.values, vec![("search".to_string(), Value::from("admin"))]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ClapParser;

impl ClapParser {
    pub fn new() -> Self {
        Self
    }

    /// Builds the `clap` command for `node`.
    pub fn command(&self, node: &CommandNode) -> clap::Command {
        let mut command = clap::Command::new(node.name().to_string())
            .about(node.description().to_string())
            .no_binary_name(true)
            .disable_version_flag(true)
            .disable_help_subcommand(true)
            .args_override_self(true);

        for option in node.kind().options() {
            command = command.arg(option_arg(option));
            if let Some(negated) = negated_arg(option) {
                command = command.arg(negated);
            }
        }

        for child in node.children().iter() {
            command = command.subcommand(
                clap::Command::new(child.name().to_string())
                    .about(child.description().to_string())
                    .visible_aliases(child.aliases().to_vec())
                    .disable_help_flag(true)
                    .arg(
                        Arg::new(REST)
                            .num_args(0..)
                            .trailing_var_arg(true)
                            .allow_hyphen_values(true),
                    ),
            );
        }

        command
    }
}

impl ArgumentParser for ClapParser {
    fn parse(&self, node: &CommandNode, args: &[String]) -> Result<ParsedArguments, ParseError> {
        let matches = self
            .command(node)
            .try_get_matches_from(args)
            .map_err(parse_error)?;

        let mut parsed = ParsedArguments::default();
        for option in node.kind().options() {
            if let Some(value) = option_value(&matches, option) {
                parsed
                    .values
                    .push((option.attribute_name().to_string(), value));
            }
        }

        if let Some((name, sub)) = matches.subcommand() {
            parsed.subcommand = Some(name.to_string());
            parsed.remaining = sub
                .get_many::<String>(REST)
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
        }

        Ok(parsed)
    }
}

fn option_arg(option: &OptionDefinition) -> Arg {
    let mut arg = Arg::new(option.attribute_name().to_string()).help(option.help_text());

    let mut longs = option
        .switches()
        .iter()
        .filter_map(|s| s.strip_prefix("--"))
        .map(|s| s.trim_start_matches(NEGATION_PREFIX).to_string());
    if let Some(first) = longs.next() {
        arg = arg.long(first).visible_aliases(longs.collect::<Vec<_>>());
    }

    let mut shorts = option
        .switches()
        .iter()
        .filter(|s| !s.starts_with("--"))
        .filter_map(|s| s.chars().nth(1));
    if let Some(first) = shorts.next() {
        arg = arg.short(first).visible_short_aliases(shorts.collect::<Vec<_>>());
    }

    match option.value_type() {
        ValueType::Flag => arg.action(ArgAction::SetTrue),
        ValueType::Choice(choices) => arg
            .action(ArgAction::Set)
            .value_name(option.value_type().placeholder())
            .value_parser(PossibleValuesParser::new(choices.clone())),
        other => arg.action(ArgAction::Set).value_name(other.placeholder()),
    }
}

/// `--no-name` companion of a `--[no-]name` flag.
fn negated_arg(option: &OptionDefinition) -> Option<Arg> {
    let name = option
        .switches()
        .iter()
        .find_map(|s| s.strip_prefix("--")?.strip_prefix(NEGATION_PREFIX))?;
    Some(
        Arg::new(negated_id(option))
            .long(format!("no-{name}"))
            .action(ArgAction::SetTrue)
            .overrides_with(option.attribute_name().to_string())
            .hide(true),
    )
}

fn negated_id(option: &OptionDefinition) -> String {
    format!("no-{}", option.attribute_name())
}

/// Raw value of an option given on the command line.
fn option_value(matches: &ArgMatches, option: &OptionDefinition) -> Option<Value> {
    let id = option.attribute_name();
    let negated = negated_id(option);
    let on_command_line = |id: &str| {
        matches
            .try_contains_id(id)
            .unwrap_or(false)
            && matches.value_source(id) == Some(ValueSource::CommandLine)
    };

    if on_command_line(&negated) && matches.get_flag(&negated) {
        return Some(Value::Bool(false));
    }
    if !on_command_line(id) {
        return None;
    }
    if option.value_type().takes_value() {
        matches.get_one::<String>(id).cloned().map(Value::String)
    } else {
        Some(Value::Bool(matches.get_flag(id)))
    }
}

fn parse_error(err: clap::Error) -> ParseError {
    let rendered = err.render().to_string();
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => ParseError::Help(rendered),
        _ => {
            let first = rendered.lines().next().unwrap_or_default();
            ParseError::Usage(first.trim_start_matches("error: ").to_string())
        }
    }
}
