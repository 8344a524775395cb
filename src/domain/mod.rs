//! Domain module
//!
//! Core domain types and business logic.

pub mod amount;
pub mod context;
pub mod currency;
pub mod entity;
pub mod error;
pub mod investment;
pub mod transaction;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use currency::{CurrencyCode, CurrencyError};
pub use entity::{BalanceEntity, EntityKind, EntityStatus};
pub use error::DomainError;
pub use investment::{
    AccrualStep, GrowthApplication, GrowthMetadata, Investment, InvestmentStatus, SkipReason,
    WithdrawalRecord,
};
pub use transaction::{
    generate_reference, LedgerTransaction, LegKind, TransactionKind, TransactionLeg,
    TransactionStatus,
};
