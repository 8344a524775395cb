//! Balance entities
//!
//! Wallet, Account and Card share one shape: an owner-held object with a
//! currency and a balance. State transitions are pure; persistence lives
//! in the store layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::amount::{Amount, Balance};
use super::currency::CurrencyCode;
use super::error::DomainError;

/// Which balance-holding collection an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Wallet,
    Account,
    Card,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Wallet => "wallet",
            EntityKind::Account => "account",
            EntityKind::Card => "card",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entity lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Active,
    Inactive,
    Frozen,
    Closed,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Active => "active",
            EntityStatus::Inactive => "inactive",
            EntityStatus::Frozen => "frozen",
            EntityStatus::Closed => "closed",
        }
    }
}

impl From<&str> for EntityStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => EntityStatus::Active,
            "inactive" => EntityStatus::Inactive,
            "frozen" => EntityStatus::Frozen,
            "closed" => EntityStatus::Closed,
            _ => EntityStatus::Inactive,
        }
    }
}

impl Default for EntityStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A balance-holding entity (Wallet, Account or Card).
///
/// # Invariants
/// - `balance` is never negative; a debit that would violate this fails
///   before any state changes
/// - Only active entities accept debits or credits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: EntityKind,
    pub currency: CurrencyCode,
    /// Available balance
    pub balance: Balance,
    /// Settled balance; may lag `balance` while holds are pending
    pub ledger_balance: Balance,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
}

impl BalanceEntity {
    pub fn new(
        id: Uuid,
        user_id: Uuid,
        kind: EntityKind,
        currency: CurrencyCode,
        balance: Balance,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            currency,
            ledger_balance: balance.clone(),
            balance,
            status: EntityStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.status != EntityStatus::Active {
            return Err(DomainError::EntityNotActive {
                kind: self.kind,
                id: self.id,
            });
        }
        Ok(())
    }

    /// Debit the entity. Sufficiency is checked strictly before mutation.
    pub fn debit(&mut self, amount: &Amount) -> Result<(), DomainError> {
        self.ensure_active()?;

        if !self.balance.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_funds(
                amount.value(),
                self.balance.value(),
            ));
        }

        self.balance = self.balance.debit(amount)?;
        self.ledger_balance = self.ledger_balance.debit(amount).unwrap_or_else(|_| {
            // Ledger balance lagging below the debit means a hold is
            // outstanding; settle it at zero rather than going negative.
            Balance::zero()
        });
        Ok(())
    }

    /// Credit the entity.
    pub fn credit(&mut self, amount: &Amount) -> Result<(), DomainError> {
        self.ensure_active()?;
        self.balance = self.balance.credit(amount)?;
        self.ledger_balance = self.ledger_balance.credit(amount)?;
        Ok(())
    }

    pub fn balance_value(&self) -> Decimal {
        self.balance.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wallet_with(balance: Decimal) -> BalanceEntity {
        BalanceEntity::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            EntityKind::Wallet,
            CurrencyCode::usd(),
            Balance::new(balance).unwrap(),
        )
    }

    #[test]
    fn test_credit_then_debit() {
        let mut wallet = wallet_with(dec!(0));
        wallet.credit(&Amount::new(dec!(100)).unwrap()).unwrap();
        assert_eq!(wallet.balance_value(), dec!(100));

        wallet.debit(&Amount::new(dec!(30)).unwrap()).unwrap();
        assert_eq!(wallet.balance_value(), dec!(70));
        assert_eq!(wallet.ledger_balance.value(), dec!(70));
    }

    #[test]
    fn test_debit_insufficient_leaves_balance_unchanged() {
        let mut wallet = wallet_with(dec!(50));
        let result = wallet.debit(&Amount::new(dec!(60)).unwrap());

        assert!(matches!(
            result,
            Err(DomainError::InsufficientFunds { .. })
        ));
        assert_eq!(wallet.balance_value(), dec!(50));
    }

    #[test]
    fn test_debit_exact_balance() {
        let mut wallet = wallet_with(dec!(100));
        wallet.debit(&Amount::new(dec!(100)).unwrap()).unwrap();
        assert_eq!(wallet.balance_value(), dec!(0));
    }

    #[test]
    fn test_frozen_entity_rejects_mutation() {
        let mut wallet = wallet_with(dec!(100));
        wallet.status = EntityStatus::Frozen;

        let amount = Amount::new(dec!(10)).unwrap();
        assert!(matches!(
            wallet.debit(&amount),
            Err(DomainError::EntityNotActive { .. })
        ));
        assert!(matches!(
            wallet.credit(&amount),
            Err(DomainError::EntityNotActive { .. })
        ));
        assert_eq!(wallet.balance_value(), dec!(100));
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in [
            EntityStatus::Active,
            EntityStatus::Inactive,
            EntityStatus::Frozen,
            EntityStatus::Closed,
        ] {
            assert_eq!(EntityStatus::from(status.as_str()), status);
        }
    }
}
