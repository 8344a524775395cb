//! Transfer command definitions
//!
//! Commands represent intentions to move money. Validation that needs no
//! I/O happens at construction time, so an invalid command cannot reach
//! the engine.

use uuid::Uuid;

use crate::domain::{Amount, DomainError, EntityKind};

/// The account-or-card side of a withdraw/deposit. An enum, so exactly
/// one counterparty type exists by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counterparty {
    Account(Uuid),
    Card(Uuid),
}

impl Counterparty {
    /// Build from optional request fields, requiring exactly one.
    pub fn from_options(
        account_id: Option<Uuid>,
        card_id: Option<Uuid>,
    ) -> Result<Self, DomainError> {
        match (account_id, card_id) {
            (Some(id), None) => Ok(Counterparty::Account(id)),
            (None, Some(id)) => Ok(Counterparty::Card(id)),
            (Some(_), Some(_)) => Err(DomainError::Validation(
                "specify either account_id or card_id, not both".to_string(),
            )),
            (None, None) => Err(DomainError::Validation(
                "specify account_id or card_id".to_string(),
            )),
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            Counterparty::Account(id) | Counterparty::Card(id) => *id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Counterparty::Account(_) => EntityKind::Account,
            Counterparty::Card(_) => EntityKind::Card,
        }
    }
}

/// Move money from a wallet out to an account or card.
#[derive(Debug, Clone)]
pub struct WithdrawCommand {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Amount,
    pub destination: Counterparty,
}

/// Fund a wallet from an account or card.
#[derive(Debug, Clone)]
pub struct DepositCommand {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Amount,
    pub source: Counterparty,
}

/// Move money between two wallets, converting currency when they differ.
#[derive(Debug, Clone)]
pub struct SwapCommand {
    pub user_id: Uuid,
    pub source_wallet_id: Uuid,
    pub destination_wallet_id: Uuid,
    pub amount: Amount,
}

impl SwapCommand {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.source_wallet_id == self.destination_wallet_id {
            return Err(DomainError::Validation(
                "cannot swap a wallet with itself".to_string(),
            ));
        }
        Ok(())
    }
}
