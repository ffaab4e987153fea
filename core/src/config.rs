//! Lifecycle settings.
//!
//! Settings are optional; every key has a default so a partial YAML file is
//! enough.
//!
//! # Example YAML
//!
//! ```yaml
//! program_name: hammer
//! audit_options: true
//! log_filter: info
//! redacted_suffixes:
//!   - token
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Attributes ending in this suffix are masked whatever the settings say.
pub const PASSWORD_SUFFIX: &str = "password";

/// Settings consulted by the execution lifecycle.
///
/// # Examples
///
/// ```
/// use cmdkit_core::Settings;
///
/// let settings = Settings::from_yaml_str("program_name: hammer\n").unwrap();
/// assert_eq!(settings.program_name, "hammer");
/// assert!(settings.audit_options);
/// assert!(settings.is_redacted("user_password"));
/// assert!(!settings.is_redacted("login"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Program name used in usage hints.
    pub program_name: String,
    /// Emit the `Called with options` audit record after validation.
    pub audit_options: bool,
    /// Fallback log filter when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Attribute-name suffixes masked in audit records in addition to
    /// [`PASSWORD_SUFFIX`], which is always masked.
    pub redacted_suffixes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            program_name: "cmdkit".to_string(),
            audit_options: true,
            log_filter: "warn".to_string(),
            redacted_suffixes: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ConfigurationError::IoError) if the file
    /// cannot be read, or [`YamlError`](crate::ConfigurationError::YamlError)
    /// if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let settings = serde_yaml::from_reader(reader)?;
        Ok(settings)
    }

    /// Saves the settings as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Returns `true` if values of `attribute` must be masked.
    pub fn is_redacted(&self, attribute: &str) -> bool {
        attribute.ends_with(PASSWORD_SUFFIX)
            || self
                .redacted_suffixes
                .iter()
                .any(|suffix| attribute.ends_with(suffix.as_str()))
    }
}
