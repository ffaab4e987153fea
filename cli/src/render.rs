//! Stdout renderer: aligned text or JSON.

use std::io::IsTerminal;

use cmdkit_core::{FieldType, OutputDefinition, OutputField, OutputRenderer, Value};
use serde_json::Map;

/// Output format of the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Text,
    Json,
}

impl RenderFormat {
    /// Reads `CMDKIT_FORMAT` (`text` or `json`), falling back to text on a
    /// terminal and JSON otherwise.
    pub fn from_env() -> Self {
        match std::env::var("CMDKIT_FORMAT").ok().as_deref() {
            Some("json") => Self::Json,
            Some("text") => Self::Text,
            _ if std::io::stdout().is_terminal() => Self::Text,
            _ => Self::Json,
        }
    }
}

/// Prints records to stdout and errors to stderr.
#[derive(Debug, Clone, Copy)]
pub struct StdoutRenderer {
    format: RenderFormat,
}

impl StdoutRenderer {
    pub fn new(format: RenderFormat) -> Self {
        Self { format }
    }
}

impl OutputRenderer for StdoutRenderer {
    fn print_record(&mut self, definition: &OutputDefinition, record: &Value) {
        match self.format {
            RenderFormat::Text => print!("{}", format_record(definition.fields(), record, 0)),
            RenderFormat::Json => println!("{}", to_json(&project(definition.fields(), record))),
        }
    }

    fn print_collection(&mut self, definition: &OutputDefinition, records: &[Value]) {
        match self.format {
            RenderFormat::Text => print!("{}", format_table(definition, records)),
            RenderFormat::Json => {
                let projected: Vec<Value> = records
                    .iter()
                    .map(|r| project(definition.fields(), r))
                    .collect();
                println!("{}", to_json(&Value::Array(projected)));
            }
        }
    }

    fn print_message(&mut self, message: &str) {
        println!("{message}");
    }

    fn print_error(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

fn to_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Keeps only the declared fields of `record`.
fn project(fields: &[OutputField], record: &Value) -> Value {
    let mut map = Map::new();
    for field in fields {
        let value = &record[&field.key];
        let projected = match (&field.field_type, value) {
            (FieldType::Collection(nested), Value::Array(items)) => {
                Value::Array(items.iter().map(|item| project(nested, item)).collect())
            }
            _ => value.clone(),
        };
        map.insert(field.key.clone(), projected);
    }
    Value::Object(map)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "yes".to_string(),
        Value::Bool(false) => "no".to_string(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// `Label: value` lines; nested collections are numbered and indented.
fn format_record(fields: &[OutputField], record: &Value, indent: usize) -> String {
    let width = fields.iter().map(|f| f.label.len()).max().unwrap_or(0) + 1;
    let pad = " ".repeat(indent);
    let mut out = String::new();

    for field in fields {
        let value = &record[&field.key];
        match &field.field_type {
            FieldType::Collection(nested) => {
                out.push_str(&format!("{pad}{}:\n", field.label));
                let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                for (i, item) in items.iter().enumerate() {
                    let body = format_record(nested, item, indent + 4);
                    let numbered = format!("{pad} {}) {}", i + 1, body.trim_start());
                    out.push_str(&numbered);
                }
            }
            _ => {
                let label = format!("{}:", field.label);
                out.push_str(&format!("{pad}{label:<width$} {}\n", cell(value)));
            }
        }
    }
    out
}

/// Aligned table of the non-nested fields.
fn format_table(definition: &OutputDefinition, records: &[Value]) -> String {
    let columns: Vec<&OutputField> = definition
        .fields()
        .iter()
        .filter(|f| !matches!(f.field_type, FieldType::Collection(_)))
        .collect();
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| columns.iter().map(|c| cell(&r[&c.key])).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(c.label.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(text, &width)| format!("{text:<width$}"))
            .collect();
        format!("{}\n", padded.join(" | ").trim_end())
    };

    let mut out = line(columns.iter().map(|c| c.label.as_str()).collect());
    out.push_str(&format!(
        "{}\n",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-|-")
    ));
    for row in &rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
    }
    out
}
