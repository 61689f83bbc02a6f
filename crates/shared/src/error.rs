use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown form field '{name}'")]
pub struct UnknownField {
    pub name: String,
}

impl UnknownField {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Why a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("expected {expected}, got {raw:?}")]
    Unparseable { raw: String, expected: &'static str },
    #[error("must be at least {min}, got {actual}")]
    BelowMinimum { min: String, actual: String },
    #[error("must be at most {max}, got {actual}")]
    AboveMaximum { max: String, actual: String },
    #[error("{actual:?} is not one of {allowed:?}")]
    NotAllowed {
        actual: String,
        allowed: &'static [&'static str],
    },
    #[error("holds a value that is not {expected}")]
    WrongType { expected: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {violation}")]
pub struct FieldViolation {
    pub field: &'static str,
    pub violation: Violation,
}

/// Raised when the form cannot be turned into a request. Carries every
/// offending field, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    pub fn single(field: &'static str, violation: Violation) -> Self {
        Self::new(vec![FieldViolation { field, violation }])
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }

    pub fn names(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid form input")?;
        for (idx, violation) in self.violations.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(f, "{sep}{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestErrorKind {
    NetworkFailure,
    ServerError(u16),
    DecodeFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("prediction service unreachable: {message}")]
    NetworkFailure { message: String, timed_out: bool },
    #[error("prediction service returned status {status}")]
    ServerError {
        status: u16,
        detail: Option<String>,
    },
    #[error("unexpected prediction response: {message}")]
    DecodeFailure { message: String },
}

impl RequestError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> RequestErrorKind {
        match self {
            Self::NetworkFailure { .. } => RequestErrorKind::NetworkFailure,
            Self::ServerError { status, .. } => RequestErrorKind::ServerError(*status),
            Self::DecodeFailure { .. } => RequestErrorKind::DecodeFailure,
        }
    }

    /// Decode failures point at a contract mismatch and are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkFailure { .. } => true,
            Self::ServerError { status, .. } => {
                matches!(*status, 408 | 429) || (500..600).contains(status)
            }
            Self::DecodeFailure { .. } => false,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::ServerError { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}
