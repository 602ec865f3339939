//! Field-level validation.
//!
//! Validation never fails fatally: it produces a [`Violations`] set that maps each
//! offending field to one message. An empty set means the value is valid. Persistence
//! paths turn a non-empty set into [`DomainError::Invalid`] via [`Validate::ensure_valid`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

pub const MUST_NOT_BE_BLANK: &str = "must not be blank";
pub const MUST_BE_WELL_FORMED_EMAIL: &str = "must be a well-formed email address";
pub const MUST_BE_NON_NEGATIVE: &str = "must be greater than or equal to 0";

// local-part@domain, where the domain is one or more dot-separated labels.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)*$",
    )
    .expect("email pattern is a valid regex")
});

/// `true` when the value is empty or whitespace-only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Well-formed email syntax check. Blank input is never well-formed.
pub fn is_well_formed_email(value: &str) -> bool {
    !is_blank(value) && EMAIL_PATTERN.is_match(value)
}

/// Set of violated field rules, keyed by field name.
///
/// Each field carries at most one message: the first rule that fails for a field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Violations(BTreeMap<String, String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message recorded for `field`, if that field is invalid.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `(field, message)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }

    /// Record a violation unless the field already has one.
    pub fn add(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
        self
    }

    pub fn require_not_blank(&mut self, field: &str, value: &str) -> &mut Self {
        if is_blank(value) {
            self.add(field, MUST_NOT_BE_BLANK);
        }
        self
    }

    pub fn require_email(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_well_formed_email(value) {
            self.add(field, MUST_BE_WELL_FORMED_EMAIL);
        }
        self
    }

    pub fn require_non_negative<T>(&mut self, field: &str, value: T) -> &mut Self
    where
        T: PartialOrd + Default,
    {
        if value < T::default() {
            self.add(field, MUST_BE_NON_NEGATIVE);
        }
        self
    }

    /// `Ok(())` when empty, otherwise `DomainError::Invalid` carrying the set.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Invalid(self))
        }
    }
}

impl core::fmt::Display for Violations {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Field-level validation contract for entities.
pub trait Validate {
    /// Evaluate every field rule and collect the violations.
    fn validate(&self) -> Violations;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Reject the value if any rule is violated.
    fn ensure_valid(&self) -> DomainResult<()> {
        self.validate().into_result()
    }
}
