//! Option definitions and their derived accessors.
//!
//! An [`OptionDefinition`] is created once when a command type is declared
//! and never changes afterwards. Per-invocation values live in
//! [`OptionValues`]; the [`OptionAccessor`] derived from a definition is the
//! only way values get written, so conversion and context-target propagation
//! happen in exactly one place.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::Settings;
use crate::context::ExecutionContext;
use crate::error::ConversionError;
use crate::{Value, ValueType};

/// Fixed string shown in place of redacted option values.
pub const REDACTED_MASK: &str = "***";

/// Custom conversion run by the write accessor on a raw value.
pub type Conversion = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Formats an option value for presentation (help text, descriptions).
pub type ValueFormatter = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Every declared attribute name mapped to its value; `None` means unset.
pub type OptionMap = BTreeMap<String, Option<Value>>;

/// Declarative description of one CLI-bindable attribute.
///
/// # Examples
///
/// ```
/// use cmdkit_core::{OptionDefinition, ValueType};
///
/// let opt = OptionDefinition::new(&["-o", "--organization-id"], ValueType::Number, "Organization")
///     .with_context_target("organization_id");
/// assert_eq!(opt.attribute_name(), "organization_id");
/// assert_eq!(opt.primary_switch(), "--organization-id");
/// assert_eq!(opt.context_target(), Some("organization_id"));
/// ```
#[derive(Clone)]
pub struct OptionDefinition {
    switches: Vec<String>,
    value_type: ValueType,
    description: String,
    attribute_name: String,
    default: Option<Value>,
    required: bool,
    context_target: Option<String>,
    value_formatter: Option<ValueFormatter>,
    conversion: Option<Conversion>,
}

impl OptionDefinition {
    /// Creates an option with the given switch spellings.
    ///
    /// The attribute name is derived from the first long switch
    /// (`--dry-run` → `dry_run`, `--[no-]color` → `color`), falling back to a
    /// short switch letter.
    pub fn new(switches: &[&str], value_type: ValueType, description: &str) -> Self {
        let switches: Vec<String> = switches.iter().map(|s| s.to_string()).collect();
        let attribute_name = derive_attribute_name(&switches);
        Self {
            switches,
            value_type,
            description: description.to_string(),
            attribute_name,
            default: None,
            required: false,
            context_target: None,
            value_formatter: None,
            conversion: None,
        }
    }

    /// Overrides the derived attribute name.
    pub fn with_attribute_name(mut self, name: &str) -> Self {
        self.attribute_name = name.to_string();
        self
    }

    /// Sets the value stored before any argument is parsed.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the option as mandatory.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Also writes converted values into the execution context under `key`.
    pub fn with_context_target(mut self, key: &str) -> Self {
        self.context_target = Some(key.to_string());
        self
    }

    /// Sets the presentation formatter.
    pub fn with_formatter(mut self, formatter: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.value_formatter = Some(Arc::new(formatter));
        self
    }

    /// Replaces the default conversion for the declared type.
    pub fn with_conversion(
        mut self,
        conversion: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.conversion = Some(Arc::new(conversion));
        self
    }

    pub fn switches(&self) -> &[String] {
        &self.switches
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn context_target(&self) -> Option<&str> {
        self.context_target.as_deref()
    }

    /// Returns the switch used in messages (long form preferred).
    pub fn primary_switch(&self) -> &str {
        self.switches
            .iter()
            .find(|s| s.starts_with("--"))
            .or_else(|| self.switches.first())
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    /// Checks whether `name` is one of the switches or the attribute name.
    pub fn matches(&self, name: &str) -> bool {
        self.attribute_name == name || self.switches.iter().any(|s| s == name)
    }

    /// Formats a value with the declared formatter, or plainly.
    pub fn format_value(&self, value: &Value) -> String {
        match &self.value_formatter {
            Some(formatter) => formatter(value),
            None => plain(value),
        }
    }

    /// Help line: description plus the formatted default, if any.
    pub fn help_text(&self) -> String {
        match &self.default {
            Some(default) => format!("{} (default: {})", self.description, self.format_value(default)),
            None => self.description.clone(),
        }
    }

    /// Runs the custom conversion, or the default one for the declared type.
    pub fn convert(&self, raw: Value) -> Result<Value, ConversionError> {
        let converted = match &self.conversion {
            Some(conversion) => conversion(raw),
            None => default_conversion(&self.value_type, raw),
        };
        converted.map_err(|message| ConversionError {
            option: self.primary_switch().to_string(),
            message,
        })
    }

    /// Returns the read/write accessor pair for this option.
    pub fn accessor(&self) -> OptionAccessor<'_> {
        OptionAccessor { definition: self }
    }
}

impl fmt::Debug for OptionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDefinition")
            .field("switches", &self.switches)
            .field("value_type", &self.value_type)
            .field("attribute_name", &self.attribute_name)
            .field("default", &self.default)
            .field("required", &self.required)
            .field("context_target", &self.context_target)
            .field("custom_conversion", &self.conversion.is_some())
            .finish()
    }
}

/// Read and write accessors derived from one [`OptionDefinition`].
#[derive(Debug, Clone, Copy)]
pub struct OptionAccessor<'d> {
    definition: &'d OptionDefinition,
}

impl<'d> OptionAccessor<'d> {
    /// Returns the stored value, or `None` when unset.
    pub fn read<'v>(&self, values: &'v OptionValues) -> Option<&'v Value> {
        values.get(self.definition.attribute_name())
    }

    /// Converts `raw`, mirrors it into the context when a target is
    /// configured, and stores it.
    pub fn write(
        &self,
        values: &mut OptionValues,
        context: &mut ExecutionContext,
        raw: Value,
    ) -> Result<(), ConversionError> {
        let value = self.definition.convert(raw)?;
        if let Some(target) = self.definition.context_target() {
            context.insert(target, value.clone());
        }
        values.set(self.definition.attribute_name(), value);
        Ok(())
    }
}

/// Stored option values of one command instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionValues {
    values: BTreeMap<String, Value>,
}

impl OptionValues {
    /// Starts from the declared defaults.
    pub fn with_defaults(definitions: &[OptionDefinition]) -> Self {
        let values = definitions
            .iter()
            .filter_map(|d| {
                d.default_value()
                    .map(|v| (d.attribute_name().to_string(), v.clone()))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.values.get(attribute)
    }

    pub(crate) fn set(&mut self, attribute: &str, value: Value) {
        self.values.insert(attribute.to_string(), value);
    }

    /// Every declared attribute with its value; unset ones map to `None`.
    pub fn all_options(&self, definitions: &[OptionDefinition]) -> OptionMap {
        definitions
            .iter()
            .map(|d| (d.attribute_name().to_string(), self.get(d.attribute_name()).cloned()))
            .collect()
    }

    /// Only the attributes that hold a value.
    pub fn options(&self, definitions: &[OptionDefinition]) -> BTreeMap<String, Value> {
        self.all_options(definitions)
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect()
    }
}

/// Copies `snapshot`, masking every attribute the settings mark as redacted.
///
/// # Examples
///
/// ```
/// use cmdkit_core::{OptionMap, Settings, Value, redact_snapshot, REDACTED_MASK};
///
/// let mut snapshot = OptionMap::new();
/// snapshot.insert("password".into(), Some(Value::from("secret123")));
/// snapshot.insert("login".into(), Some(Value::from("admin")));
///
/// let safe = redact_snapshot(&snapshot, &Settings::default());
/// assert_eq!(safe["password"], Some(Value::from(REDACTED_MASK)));
/// assert_eq!(safe["login"], Some(Value::from("admin")));
/// assert_eq!(snapshot["password"], Some(Value::from("secret123")));
/// ```
pub fn redact_snapshot(snapshot: &OptionMap, settings: &Settings) -> OptionMap {
    snapshot
        .iter()
        .map(|(key, value)| {
            if settings.is_redacted(key) {
                (key.clone(), Some(Value::String(REDACTED_MASK.to_string())))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Renders a snapshot as `{key => value, ...}` for log lines.
pub fn format_snapshot(snapshot: &OptionMap) -> String {
    let entries: Vec<String> = snapshot
        .iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{key} => {}", plain(value)),
            None => format!("{key} => unset"),
        })
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(plain).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn derive_attribute_name(switches: &[String]) -> String {
    let long = switches.iter().find(|s| s.starts_with("--"));
    let name = match long {
        Some(long) => long.trim_start_matches("--").trim_start_matches("[no-]"),
        None => switches
            .first()
            .map(|s| s.trim_start_matches('-'))
            .unwrap_or_default(),
    };
    name.replace('-', "_")
}

fn default_conversion(value_type: &ValueType, raw: Value) -> Result<Value, String> {
    // Parsers hand over strings; anything already typed is trusted as-is.
    let Value::String(text) = raw else {
        return Ok(raw);
    };

    match value_type {
        ValueType::Number => parse_number(&text),
        ValueType::Boolean | ValueType::Flag => parse_boolean(&text),
        ValueType::List => Ok(Value::Array(
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        )),
        ValueType::Choice(choices) => {
            if choices.iter().any(|c| *c == text) {
                Ok(Value::String(text))
            } else {
                Err(format!(
                    "value must be one of: {} (got '{text}')",
                    choices.join(", ")
                ))
            }
        }
        ValueType::String | ValueType::File | ValueType::Any => Ok(Value::String(text)),
    }
}

fn parse_number(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Value::from(n));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("numeric value is required (got '{text}')"))
}

fn parse_boolean(text: &str) -> Result<Value, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(format!("boolean value is required (got '{text}')")),
    }
}
