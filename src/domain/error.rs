//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::amount::AmountError;
use super::currency::CurrencyError;
use super::entity::EntityKind;

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant
/// failures. They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed or missing input; fails fast, before any I/O
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Balance entity absent or not owned by the requesting user
    #[error("{kind} not found: {id}")]
    EntityNotFound { kind: EntityKind, id: Uuid },

    /// Investment absent or not owned by the requesting user
    #[error("Investment not found: {0}")]
    InvestmentNotFound(Uuid),

    /// Debit would take the balance below zero
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// Entity exists but is inactive, frozen or closed
    #[error("{kind} {id} is not active")]
    EntityNotActive { kind: EntityKind, id: Uuid },

    /// Investment is in a state that does not allow the operation
    #[error("Investment {id} is {status}")]
    InvestmentNotActive { id: Uuid, status: String },

    /// State that should never occur; logged at error severity and the
    /// record is excluded from automatic processing until repaired
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Check if this is a client error (caller can correct the request)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InsufficientFunds { .. }
                | Self::EntityNotActive { .. }
                | Self::InvestmentNotActive { .. }
        )
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. } | Self::InvestmentNotFound(_)
        )
    }
}

impl From<AmountError> for DomainError {
    fn from(e: AmountError) -> Self {
        DomainError::Validation(e.to_string())
    }
}

impl From<CurrencyError> for DomainError {
    fn from(e: CurrencyError) -> Self {
        DomainError::Validation(e.to_string())
    }
}
