//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, stock checks). Persistence failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A quantity was not a positive integer (or otherwise out of range).
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A withdrawal asked for more than the record has left.
    #[error("insufficient stock (requested: {requested}, remaining: {remaining})")]
    InsufficientStock { requested: u32, remaining: u32 },

    /// Nothing is left to ship on the record.
    #[error("record {0} is already fully shipped")]
    AlreadyShipped(String),

    /// A persisted field could not be interpreted.
    #[error("malformed field `{field}`: {value:?}")]
    MalformedRecord { field: &'static str, value: String },

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// No record carries the requested order number.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. duplicate order number).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(order_number: impl Into<String>) -> Self {
        Self::NotFound(order_number.into())
    }

    pub fn malformed(field: &'static str, value: impl Into<String>) -> Self {
        Self::MalformedRecord {
            field,
            value: value.into(),
        }
    }
}
