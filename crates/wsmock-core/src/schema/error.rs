use serde_json::{Number, Value};
use thiserror::Error;

/// Hard failures: the specification is invalid or uses an unsupported feature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("malformed schema at {path}: {detail}")]
    MalformedSchema { path: String, detail: String },

    #[error("unsupported schema type '{type_name}' at {path}")]
    UnsupportedType { path: String, type_name: String },

    #[error("unsupported reference '{0}': only absolute references starting with '#' are supported")]
    UnsupportedReference(String),

    #[error("reference '{reference}' not found: no entry for segment '{segment}'")]
    ReferenceNotFound { reference: String, segment: String },
}

impl SchemaError {
    pub(crate) fn malformed(path: &str, detail: impl Into<String>) -> Self {
        SchemaError::MalformedSchema {
            path: path.to_string(),
            detail: detail.into(),
        }
    }
}

/// Why a value did not conform to a schema node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureReason {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{value} is outside the range [{}, {}]", bound(.minimum), bound(.maximum))]
    RangeViolation {
        value: Number,
        minimum: Option<Number>,
        maximum: Option<Number>,
    },

    #[error("missing property '{0}'")]
    MissingProperty(String),

    #[error("{value} is not one of {}", Value::from(.allowed.clone()))]
    EnumMismatch { value: Value, allowed: Vec<Value> },

    #[error("none of the {} alternatives matched", .0.len())]
    NoAlternativeMatched(Vec<ValidationFailure>),
}

fn bound(bound: &Option<Number>) -> String {
    bound
        .as_ref()
        .map(Number::to_string)
        .unwrap_or_else(|| "..".to_string())
}

/// Expected failure: recovered locally, never propagated as an error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason} at {path}")]
pub struct ValidationFailure {
    /// `$` がルート、`$.pet.weight` のようにプロパティを辿る
    pub path: String,
    pub reason: FailureReason,
}

impl ValidationFailure {
    pub fn new(path: &str, reason: FailureReason) -> Self {
        Self {
            path: path.to_string(),
            reason,
        }
    }
}
