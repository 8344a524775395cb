//! Store module
//!
//! Persistence layer. Read methods run against the pool; every mutating
//! method takes an explicit `sqlx::Transaction`, so one logical operation
//! commits or aborts as a whole and the engines stay portable across
//! datastores with multi-statement transactions.

mod balance_repository;
mod error;
mod investment_repository;
mod ledger_repository;

pub use balance_repository::BalanceRepository;
pub use error::StoreError;
pub use investment_repository::InvestmentRepository;
pub use ledger_repository::LedgerRepository;
