//! Exception handlers and their scope-based resolution.
//!
//! A command type may be declared within one or more [`Scope`]s (a product,
//! a plugin boundary) and may itself supply a handler. When an execution
//! fault reaches the lifecycle, the handler is taken from the innermost scope
//! that declares one, falling back to [`DefaultExceptionHandler`].

use std::fmt;
use std::sync::Arc;

use tracing::error;

use crate::error::ConversionError;
use crate::exit_code;
use crate::output::OutputRenderer;

/// Converts an execution fault into a final exit code.
pub trait ExceptionHandler: Send + Sync {
    /// Reports `error` and returns the process exit code.
    fn handle(&self, error: &anyhow::Error, output: &mut dyn OutputRenderer) -> i32;
}

/// Tool-wide fallback handler.
///
/// Prints `Error: <message>`, logs the full error chain, and exits with
/// [`exit_code::SOFTWARE`] ([`exit_code::DATA_ERROR`] for conversion
/// failures).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExceptionHandler;

impl ExceptionHandler for DefaultExceptionHandler {
    fn handle(&self, err: &anyhow::Error, output: &mut dyn OutputRenderer) -> i32 {
        error!(error = %format!("{err:#}"), "command failed");
        output.print_error(&format!("Error: {err}"));
        if err.downcast_ref::<ConversionError>().is_some() {
            exit_code::DATA_ERROR
        } else {
            exit_code::SOFTWARE
        }
    }
}

/// A named nesting level that may supply an exception handler.
#[derive(Clone)]
pub struct Scope {
    name: String,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
}

impl Scope {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exception_handler: None,
        }
    }

    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exception_handler(&self) -> Option<&Arc<dyn ExceptionHandler>> {
        self.exception_handler.as_ref()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("has_handler", &self.exception_handler.is_some())
            .finish()
    }
}

/// Returns the handler of the innermost scope that declares one.
///
/// `scopes` is ordered outermost first.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use cmdkit_core::{DefaultExceptionHandler, Scope, resolve_exception_handler};
///
/// let plugin = Scope::new("plugin").with_exception_handler(Arc::new(DefaultExceptionHandler));
/// let chain = vec![Scope::new("tool"), plugin, Scope::new("list")];
/// let handler = resolve_exception_handler(&chain);
/// assert!(Arc::ptr_eq(&handler, chain[1].exception_handler().unwrap()));
/// ```
pub fn resolve_exception_handler(scopes: &[Scope]) -> Arc<dyn ExceptionHandler> {
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.exception_handler.clone())
        .unwrap_or_else(|| Arc::new(DefaultExceptionHandler))
}
