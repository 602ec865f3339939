//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, and field-level validation rules.

pub mod entity;
pub mod error;
pub mod id;
pub mod validation;

pub use entity::{Entity, ManagerScoped};
pub use error::{DomainError, DomainResult};
pub use id::{ActivityLogId, ItemId, ManagerId};
pub use validation::{Validate, Violations};
