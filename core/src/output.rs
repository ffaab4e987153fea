//! Output definitions and the renderer contract.
//!
//! A command type exposes an ordered [`OutputDefinition`]. Child types start
//! from a copy of their parent's definition and append their own fields, so
//! the parent's sequence is never touched by a child.

use serde::{Deserialize, Serialize};

use crate::Value;

/// Semantic type and formatting hint of an output field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Id,
    Number,
    Boolean,
    Date,
    List,
    KeyValue,
    /// Nested record fields.
    Collection(Vec<OutputField>),
}

/// One field a command promises to expose to a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputField {
    /// Key looked up in records.
    pub key: String,
    /// Human-readable label.
    pub label: String,
    pub field_type: FieldType,
}

impl OutputField {
    pub fn new(key: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type,
        }
    }
}

/// Ordered sequence of output fields.
///
/// Fields are never de-duplicated: appending a field whose key is already
/// present keeps both.
///
/// # Examples
///
/// ```
/// use cmdkit_core::{FieldType, OutputDefinition, OutputField};
///
/// let mut parent = OutputDefinition::new();
/// parent.append([OutputField::new("id", "Id", FieldType::Id)]);
///
/// let mut child = parent.clone();
/// child.append([OutputField::new("name", "Name", FieldType::Text)]);
///
/// assert_eq!(child.keys(), vec!["id", "name"]);
/// assert_eq!(parent.keys(), vec!["id"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputDefinition {
    fields: Vec<OutputField>,
}

impl OutputDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds fields to the end of the sequence.
    pub fn append(&mut self, fields: impl IntoIterator<Item = OutputField>) {
        self.fields.extend(fields);
    }

    pub fn fields(&self) -> &[OutputField] {
        &self.fields
    }

    /// First field with the given key.
    pub fn find(&self, key: &str) -> Option<&OutputField> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder used by command types to declare output fields.
#[derive(Debug, Default)]
pub struct OutputDsl {
    fields: Vec<OutputField>,
}

impl OutputDsl {
    /// Runs `block` against a fresh builder and returns the declared fields.
    pub fn build(block: impl FnOnce(&mut OutputDsl)) -> Vec<OutputField> {
        let mut dsl = OutputDsl::default();
        block(&mut dsl);
        dsl.fields
    }

    pub fn field(&mut self, key: &str, label: &str, field_type: FieldType) -> &mut Self {
        self.fields.push(OutputField::new(key, label, field_type));
        self
    }

    /// Declares a nested collection whose fields come from `block`.
    pub fn collection(
        &mut self,
        key: &str,
        label: &str,
        block: impl FnOnce(&mut OutputDsl),
    ) -> &mut Self {
        let nested = Self::build(block);
        self.fields
            .push(OutputField::new(key, label, FieldType::Collection(nested)));
        self
    }
}

/// Renders records and messages; implemented outside this crate.
pub trait OutputRenderer {
    fn print_record(&mut self, definition: &OutputDefinition, record: &Value);

    fn print_collection(&mut self, definition: &OutputDefinition, records: &[Value]);

    fn print_message(&mut self, message: &str);

    /// Reports usage and execution errors.
    fn print_error(&mut self, message: &str);
}

/// Replaces `%{name}` placeholders with the matching parameter.
///
/// Unknown placeholders are left as written.
///
/// # Examples
///
/// ```
/// use cmdkit_core::interpolate;
///
/// let text = interpolate("User %{login} created (%{id})", &[("login", "admin"), ("id", "7")]);
/// assert_eq!(text, "User admin created (7)");
/// ```
pub fn interpolate(message: &str, params: &[(&str, &str)]) -> String {
    params.iter().fold(message.to_string(), |text, (name, value)| {
        text.replace(&format!("%{{{name}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_duplicate_keys() {
        let mut definition = OutputDefinition::new();
        definition.append([OutputField::new("id", "Id", FieldType::Id)]);
        definition.append([OutputField::new("id", "Identifier", FieldType::Number)]);

        assert_eq!(definition.len(), 2);
        assert_eq!(definition.find("id").unwrap().label, "Id");
    }

    #[test]
    fn test_dsl_builds_nested_collection() {
        let fields = OutputDsl::build(|dsl| {
            dsl.field("id", "Id", FieldType::Id)
                .collection("roles", "Roles", |roles| {
                    roles.field("name", "Name", FieldType::Text);
                });
        });

        assert_eq!(fields.len(), 2);
        match &fields[1].field_type {
            FieldType::Collection(nested) => assert_eq!(nested[0].key, "name"),
            other => panic!("expected collection, got {other:?}"),
        }
    }

    #[test]
    fn test_interpolate_leaves_unknown_placeholders() {
        assert_eq!(interpolate("%{a} %{b}", &[("a", "1")]), "1 %{b}");
    }
}
