//! Option validation.
//!
//! Two layers live here. Definition checks run when a command type is built
//! and catch malformed or duplicate switches. The [`Validator`] runs once per
//! invocation against the resolved option values and turns constraint
//! failures into usage errors.
//!
//! # Examples
//!
//! ```
//! use cmdkit_core::*;
//!
//! let defs = vec![
//!     OptionDefinition::new(&["--id"], ValueType::Number, "Id"),
//!     OptionDefinition::new(&["--name"], ValueType::String, "Name"),
//! ];
//! let values = OptionValues::default();
//! let validator = Validator::from_values(&defs, &values);
//!
//! let err = validator.any(&["--id", "--name"]).required().unwrap_err();
//! assert_eq!(err.to_string(), "At least one of options --id, --name is required.");
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::error::{ConfigurationError, Result};
use crate::kind::ValidationBlock;
use crate::option::{OptionDefinition, OptionValues};
use crate::Value;

const RESERVED_SWITCHES: &[&str] = &["-h", "--help"];

/// Validation failures raised by constraints or validation blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Options that must all be set are missing.
    #[error("Missing arguments for {}.", .0.join(", "))]
    MissingOptions(Vec<String>),
    /// None of a group of alternatives is set.
    #[error("At least one of options {} is required.", .0.join(", "))]
    NoneOf(Vec<String>),
    /// Exactly one of a group must be set, but none is.
    #[error("One of options {} is required.", .0.join(", "))]
    OneOfMissing(Vec<String>),
    /// Exactly one of a group must be set, but several are.
    #[error("Only one of options {} can be set.", .0.join(", "))]
    TooManyOf(Vec<String>),
    /// Options that must not be set are present.
    #[error("You can't set any of options {}.", .0.join(", "))]
    Rejected(Vec<String>),
    /// Custom message raised by a validation block.
    #[error("{0}")]
    Invalid(String),
    /// A validation block referenced an option the command never declared.
    #[error("unknown option referenced in validation: {0}")]
    UnknownOption(String),
}

impl ValidationError {
    /// `false` for errors that point at a defect in the command itself.
    pub fn is_usage(&self) -> bool {
        !matches!(self, Self::UnknownOption(_))
    }
}

/// Result of validating one invocation.
#[derive(Debug)]
pub enum ValidationOutcome {
    Ok,
    /// The user passed bad input.
    UsageError(String),
    /// The command definition itself is broken.
    Fault(anyhow::Error),
}

impl From<ValidationError> for ValidationOutcome {
    fn from(err: ValidationError) -> Self {
        if err.is_usage() {
            Self::UsageError(err.to_string())
        } else {
            Self::Fault(anyhow::Error::new(err))
        }
    }
}

/// An option definition paired with its current value.
#[derive(Debug, Clone, Copy)]
pub struct BoundOption<'a> {
    pub definition: &'a OptionDefinition,
    pub value: Option<&'a Value>,
}

impl BoundOption<'_> {
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

/// Checks constraints over a resolved option list.
#[derive(Debug, Clone)]
pub struct Validator<'a> {
    options: Vec<BoundOption<'a>>,
}

impl<'a> Validator<'a> {
    pub fn new(options: Vec<BoundOption<'a>>) -> Self {
        Self { options }
    }

    /// Binds every definition to its value in `values`.
    pub fn from_values(definitions: &'a [OptionDefinition], values: &'a OptionValues) -> Self {
        Self::new(
            definitions
                .iter()
                .map(|definition| BoundOption {
                    definition,
                    value: definition.accessor().read(values),
                })
                .collect(),
        )
    }

    /// Looks an option up by switch or attribute name.
    pub fn get(&self, name: &str) -> Option<&BoundOption<'a>> {
        self.options.iter().find(|o| o.definition.matches(name))
    }

    /// Value of an option, by switch or attribute name.
    pub fn value(&self, name: &str) -> Option<&'a Value> {
        self.get(name).and_then(|o| o.value)
    }

    /// Constraint over a single option.
    pub fn option(&self, name: &str) -> Constraint<'_, 'a> {
        self.constraint(ConstraintKind::All, &[name])
    }

    /// Constraint satisfied when every listed option is set.
    pub fn all(&self, names: &[&str]) -> Constraint<'_, 'a> {
        self.constraint(ConstraintKind::All, names)
    }

    /// Constraint satisfied when at least one listed option is set.
    pub fn any(&self, names: &[&str]) -> Constraint<'_, 'a> {
        self.constraint(ConstraintKind::Any, names)
    }

    /// Constraint satisfied when exactly one listed option is set.
    pub fn one_of(&self, names: &[&str]) -> Constraint<'_, 'a> {
        self.constraint(ConstraintKind::OneOf, names)
    }

    /// Fails with every required option that is still unset.
    pub fn check_required(&self) -> std::result::Result<(), ValidationError> {
        let missing: Vec<String> = self
            .options
            .iter()
            .filter(|o| o.definition.is_required() && !o.is_set())
            .map(|o| o.definition.primary_switch().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingOptions(missing))
        }
    }

    /// Runs a validation block and classifies its result.
    pub fn run(&self, block: &ValidationBlock) -> ValidationOutcome {
        match block(self) {
            Ok(()) => ValidationOutcome::Ok,
            Err(err) => err.into(),
        }
    }

    fn constraint(&self, kind: ConstraintKind, names: &[&str]) -> Constraint<'_, 'a> {
        Constraint {
            validator: self,
            kind,
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConstraintKind {
    All,
    Any,
    OneOf,
}

/// A condition over a group of options.
#[derive(Debug, Clone)]
pub struct Constraint<'v, 'a> {
    validator: &'v Validator<'a>,
    kind: ConstraintKind,
    names: Vec<String>,
}

impl Constraint<'_, '_> {
    /// Whether the condition holds.
    pub fn exist(&self) -> std::result::Result<bool, ValidationError> {
        let set = self.set_count()?;
        Ok(match self.kind {
            ConstraintKind::All => set == self.names.len(),
            ConstraintKind::Any => set > 0,
            ConstraintKind::OneOf => set == 1,
        })
    }

    /// Fails unless the condition holds.
    pub fn required(&self) -> std::result::Result<(), ValidationError> {
        let bound = self.bound()?;
        let listed = switches(&bound, |_| true);
        match self.kind {
            ConstraintKind::All => {
                let missing = switches(&bound, |o| !o.is_set());
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(ValidationError::MissingOptions(missing))
                }
            }
            ConstraintKind::Any => {
                if bound.iter().any(|o| o.is_set()) {
                    Ok(())
                } else {
                    Err(ValidationError::NoneOf(listed))
                }
            }
            ConstraintKind::OneOf => match bound.iter().filter(|o| o.is_set()).count() {
                1 => Ok(()),
                0 => Err(ValidationError::OneOfMissing(listed)),
                _ => Err(ValidationError::TooManyOf(listed)),
            },
        }
    }

    /// Fails if any of the listed options is set.
    pub fn rejected(&self) -> std::result::Result<(), ValidationError> {
        let bound = self.bound()?;
        let present = switches(&bound, |o| o.is_set());
        if present.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Rejected(present))
        }
    }

    fn bound(&self) -> std::result::Result<Vec<BoundOption<'_>>, ValidationError> {
        self.names
            .iter()
            .map(|name| {
                self.validator
                    .get(name)
                    .copied()
                    .ok_or_else(|| ValidationError::UnknownOption(name.clone()))
            })
            .collect()
    }

    fn set_count(&self) -> std::result::Result<usize, ValidationError> {
        Ok(self.bound()?.iter().filter(|o| o.is_set()).count())
    }
}

fn switches(bound: &[BoundOption<'_>], keep: impl Fn(&BoundOption<'_>) -> bool) -> Vec<String> {
    bound
        .iter()
        .filter(|o| keep(o))
        .map(|o| o.definition.primary_switch().to_string())
        .collect()
}

/// Checks switch spellings across a command's full option list.
///
/// Short switches must look like `-x`, long ones like `--name`; every option
/// needs at least one switch, and neither a switch nor a derived attribute
/// name may repeat.
pub(crate) fn validate_switches(command: &str, options: &[OptionDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut attributes = HashSet::new();

    for option in options {
        if option.switches().is_empty() {
            return Err(ConfigurationError::MissingSwitch);
        }

        for switch in option.switches() {
            if let Some(long) = switch.strip_prefix("--") {
                let name = long.trim_start_matches("[no-]");
                if name.len() < 2 || name.starts_with('-') {
                    return Err(ConfigurationError::InvalidLongSwitch(switch.clone()));
                }
            } else if !switch.starts_with('-') || switch.chars().count() != 2 {
                return Err(ConfigurationError::InvalidShortSwitch(switch.clone()));
            }

            if RESERVED_SWITCHES.contains(&switch.as_str()) {
                return Err(ConfigurationError::ReservedSwitch(switch.clone()));
            }

            if !seen.insert(switch.clone()) {
                return Err(ConfigurationError::DuplicateSwitch {
                    command: command.to_string(),
                    switch: switch.clone(),
                });
            }
        }

        if !attributes.insert(option.attribute_name()) {
            return Err(ConfigurationError::DuplicateAttribute {
                command: command.to_string(),
                attribute: option.attribute_name().to_string(),
            });
        }
    }

    Ok(())
}
