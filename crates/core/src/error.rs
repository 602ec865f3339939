//! Errors raised by inventory domain rules.

use thiserror::Error;

use crate::validation::Violations;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failure of a domain rule. Storage and transport failures are not represented here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Field rules failed; carries every offending field with its message.
    #[error("invalid entity: {0}")]
    Invalid(Violations),

    /// An operation was attempted on a record in the wrong state (e.g. logging an unsaved item).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Text that should have been a numeric id.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found")]
    NotFound,

    /// Uniqueness clash, such as a second manager with the same email.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Field violations, when this is an `Invalid` error.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::Invalid(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Violations> for DomainError {
    fn from(value: Violations) -> Self {
        Self::Invalid(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MUST_NOT_BE_BLANK;

    #[test]
    fn violations_are_exposed_only_for_invalid() {
        let mut v = Violations::new();
        v.add("category", MUST_NOT_BE_BLANK);

        let err = DomainError::from(v.clone());
        assert_eq!(err.violations(), Some(&v));
        assert_eq!(DomainError::conflict("email taken").violations(), None);
    }

    #[test]
    fn messages() {
        assert_eq!(DomainError::NotFound.to_string(), "not found");
        assert_eq!(
            DomainError::conflict("email already registered").to_string(),
            "conflict: email already registered"
        );
    }
}
