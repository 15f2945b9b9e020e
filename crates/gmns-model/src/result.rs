//! Validation result types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured payload attached to a result (example ids, counts, metrics).
pub type Details = Map<String, Value>;

/// Outcome category of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Warning,
    Error,
    Info,
}

impl ValidationStatus {
    /// Upper-case label used in console output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Info => "INFO",
        }
    }

    /// Parse a status from its label (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Some(Self::Success),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single check outcome.
///
/// Results are built once with the `with_*` methods and then appended to the
/// run log; there are no setters after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    status: ValidationStatus,
    message: String,
    field: Option<String>,
    details: Option<Details>,
}

impl ValidationResult {
    pub fn new(status: ValidationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ValidationStatus::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ValidationStatus::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ValidationStatus::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ValidationStatus::Info, message)
    }

    /// Attach the field (column or config key) the result refers to.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach structured details.
    ///
    /// Objects are stored as-is; any other JSON value is wrapped under a
    /// `"value"` key so the payload is always an object.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(match details {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        });
        self
    }

    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    /// Look up a single details entry.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|details| details.get(key))
    }

    pub fn is_error(&self) -> bool {
        self.status == ValidationStatus::Error
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] Field: {} - {}", self.status, field, self.message),
            None => write!(f, "[{}] {}", self.status, self.message),
        }
    }
}
