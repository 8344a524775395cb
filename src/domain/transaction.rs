//! Ledger transactions
//!
//! Immutable records of completed money movements. A row is created in
//! the same unit of work as the balance mutation it describes.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::currency::CurrencyCode;
use super::entity::EntityKind;

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Swap,
    Transfer,
    Investment,
    InvestmentIncrease,
    Return,
    InvestmentWithdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Swap => "swap",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Investment => "investment",
            TransactionKind::InvestmentIncrease => "investment_increase",
            TransactionKind::Return => "return",
            TransactionKind::InvestmentWithdrawal => "investment_withdrawal",
        }
    }

    /// Prefix used in generated transaction references
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEP",
            TransactionKind::Withdrawal => "WDL",
            TransactionKind::Swap => "SWP",
            TransactionKind::Transfer => "TRF",
            TransactionKind::Investment => "INV",
            TransactionKind::InvestmentIncrease => "INC",
            TransactionKind::Return => "RET",
            TransactionKind::InvestmentWithdrawal => "IWD",
        }
    }
}

impl From<&str> for TransactionKind {
    fn from(s: &str) -> Self {
        match s {
            "deposit" => TransactionKind::Deposit,
            "withdrawal" => TransactionKind::Withdrawal,
            "swap" => TransactionKind::Swap,
            "investment" => TransactionKind::Investment,
            "investment_increase" => TransactionKind::InvestmentIncrease,
            "return" => TransactionKind::Return,
            "investment_withdrawal" => TransactionKind::InvestmentWithdrawal,
            _ => TransactionKind::Transfer,
        }
    }
}

/// Transaction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl From<&str> for TransactionStatus {
    fn from(s: &str) -> Self {
        match s {
            "completed" => TransactionStatus::Completed,
            "failed" => TransactionStatus::Failed,
            _ => TransactionStatus::Pending,
        }
    }
}

/// What a transaction leg points at. Unlike `EntityKind`, a leg can also
/// reference an investment (growth and withdrawal rows do).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    Wallet,
    Account,
    Card,
    Investment,
}

impl LegKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegKind::Wallet => "wallet",
            LegKind::Account => "account",
            LegKind::Card => "card",
            LegKind::Investment => "investment",
        }
    }
}

impl From<EntityKind> for LegKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Wallet => LegKind::Wallet,
            EntityKind::Account => LegKind::Account,
            EntityKind::Card => LegKind::Card,
        }
    }
}

impl From<&str> for LegKind {
    fn from(s: &str) -> Self {
        match s {
            "account" => LegKind::Account,
            "card" => LegKind::Card,
            "investment" => LegKind::Investment,
            _ => LegKind::Wallet,
        }
    }
}

/// One side of a money movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLeg {
    pub entity_id: Uuid,
    pub kind: LegKind,
    pub currency: CurrencyCode,
}

impl TransactionLeg {
    pub fn new(entity_id: Uuid, kind: LegKind, currency: CurrencyCode) -> Self {
        Self {
            entity_id,
            kind,
            currency,
        }
    }
}

/// An immutable ledger transaction record.
///
/// `amount` is the pre-conversion amount, expressed in `currency` (the
/// source leg's currency); `conversion_rate` is 1 for same-currency moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub source: TransactionLeg,
    pub destination: TransactionLeg,
    pub conversion_rate: Decimal,
    pub status: TransactionStatus,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<Decimal>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Build a completed transaction record with a fresh reference.
    #[allow(clippy::too_many_arguments)]
    pub fn completed(
        user_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        currency: CurrencyCode,
        source: TransactionLeg,
        destination: TransactionLeg,
        conversion_rate: Decimal,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            amount,
            currency,
            source,
            destination,
            conversion_rate,
            status: TransactionStatus::Completed,
            reference: generate_reference(kind),
            fee: None,
            description,
            created_at: Utc::now(),
        }
    }
}

/// Generate a unique transaction reference: `{PREFIX}-{epoch-ms}-{random}`
pub fn generate_reference(kind: TransactionKind) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}-{}-{:06}", kind.reference_prefix(), millis, suffix)
}
