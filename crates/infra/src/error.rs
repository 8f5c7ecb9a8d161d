//! Caller-facing error taxonomy for postings and services.

use thiserror::Error;

use grocer_core::DomainError;

use crate::store::StoreError;

/// Error returned by the ledger poster and every store-backed service.
///
/// Domain and store failures are folded into one set of categories so the
/// API can map them to statuses without knowing where they came from.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A business rule refused the operation (e.g. stock underflow under `Reject`).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate barcode or stale revision; nothing was written.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store failed; the batch was rolled back.
    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::NotFound(msg) => ServiceError::NotFound(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}
