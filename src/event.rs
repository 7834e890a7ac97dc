//! Event definitions: named event types with optional payload validation
//! and an optional bounded-history policy.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The allow-list and subscription wildcard.
pub const WILDCARD: &str = "*";

/// A single problem reported by a [`Validator`].
#[derive(Debug, Clone)]
pub struct ValidationIssue {
  /// JSON path into the offending value, e.g. `text` or `items[2].id`.
  pub path: String,
  pub message: String,
}

impl ValidationIssue {
  pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      message: message.into(),
    }
  }
}

impl fmt::Display for ValidationIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.path, self.message)
  }
}

/// Payload validation capability.
///
/// The core never inspects payload schemas itself; it only asks a validator
/// to either coerce the value or explain why it cannot. Any schema library
/// can be adapted by implementing this trait (or by using [`SchemaValidator`]
/// with a closure).
pub trait Validator: Send + Sync {
  fn validate(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>>;
}

/// Closure-backed [`Validator`] for users without a schema library.
pub struct SchemaValidator<F>(F);

impl<F> SchemaValidator<F>
where
  F: Fn(&Value) -> Result<Value, Vec<ValidationIssue>> + Send + Sync,
{
  pub fn new(f: F) -> Self {
    Self(f)
  }
}

impl<F> Validator for SchemaValidator<F>
where
  F: Fn(&Value) -> Result<Value, Vec<ValidationIssue>> + Send + Sync,
{
  fn validate(&self, value: &Value) -> Result<Value, Vec<ValidationIssue>> {
    (self.0)(value)
  }
}

/// Retention policy for one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
  /// Maximum number of messages kept in memory per room.
  pub limit: usize,
}

impl HistoryPolicy {
  pub fn new(limit: usize) -> Self {
    Self { limit }
  }
}

/// Immutable descriptor for one event type. Created at startup, frozen
/// thereafter.
#[derive(Clone)]
pub struct EventDefinition {
  name: String,
  validator: Option<Arc<dyn Validator>>,
  history: Option<HistoryPolicy>,
}

impl EventDefinition {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      validator: None,
      history: None,
    }
  }

  pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
    self.validator = Some(Arc::new(validator));
    self
  }

  pub fn with_history(mut self, limit: usize) -> Self {
    self.history = Some(HistoryPolicy::new(limit));
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn history(&self) -> Option<HistoryPolicy> {
    self.history
  }

  pub fn has_validator(&self) -> bool {
    self.validator.is_some()
  }
}

impl fmt::Debug for EventDefinition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("EventDefinition")
      .field("name", &self.name)
      .field("validator", &self.validator.is_some())
      .field("history", &self.history)
      .finish()
  }
}

/// True when `list` is empty, names `name` directly, or contains the
/// wildcard entry.
pub fn is_event_allowed(name: &str, list: &[EventDefinition]) -> bool {
  list.is_empty() || list.iter().any(|def| def.name == name || def.name == WILDCARD)
}

/// Run the definition's validator against `value`.
///
/// Definitions without a validator accept any payload unchanged. Failures
/// collapse into a single human-readable message listing every issue.
pub fn validate_event_data(def: &EventDefinition, value: &Value) -> Result<Value, String> {
  let Some(validator) = &def.validator else {
    return Ok(value.clone());
  };

  validator.validate(value).map_err(|issues| {
    let detail = issues
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join(", ");
    format!("Event '{}' validation failed: {}", def.name, detail)
  })
}
