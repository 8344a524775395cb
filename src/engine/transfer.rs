//! Transfer Engine
//!
//! Executes withdraw / deposit / swap movements. Every operation runs as
//! one unit of work: balance reads, both mutations and the ledger row
//! commit together or not at all.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Amount, BalanceEntity, DomainError, EntityKind, LedgerTransaction, OperationContext,
    TransactionKind, TransactionLeg,
};
use crate::error::{AppError, AppResult};
use crate::fx::CurrencyConverter;
use crate::notify::{self, NotificationEvent, Notifier};
use crate::store::{BalanceRepository, LedgerRepository};

use super::{DepositCommand, SwapCommand, WithdrawCommand};

/// Engine for atomic balance transfers between wallets, accounts and cards
pub struct TransferEngine {
    pool: PgPool,
    balances: BalanceRepository,
    ledger: LedgerRepository,
    converter: CurrencyConverter,
    notifier: Arc<dyn Notifier>,
}

impl TransferEngine {
    pub fn new(pool: PgPool, converter: CurrencyConverter, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            balances: BalanceRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool.clone()),
            pool,
            converter,
            notifier,
        }
    }

    /// Move money from a wallet to an account or card.
    pub async fn withdraw(
        &self,
        command: WithdrawCommand,
        context: &OperationContext,
    ) -> AppResult<LedgerTransaction> {
        self.execute(
            command.user_id,
            TransactionKind::Withdrawal,
            (EntityKind::Wallet, command.wallet_id),
            (command.destination.kind(), command.destination.entity_id()),
            &command.amount,
            format!("Withdrawal to {}", command.destination.kind()),
            context,
        )
        .await
    }

    /// Fund a wallet from an account or card.
    pub async fn deposit(
        &self,
        command: DepositCommand,
        context: &OperationContext,
    ) -> AppResult<LedgerTransaction> {
        self.execute(
            command.user_id,
            TransactionKind::Deposit,
            (command.source.kind(), command.source.entity_id()),
            (EntityKind::Wallet, command.wallet_id),
            &command.amount,
            format!("Deposit from {}", command.source.kind()),
            context,
        )
        .await
    }

    /// Move money between two wallets, converting when currencies differ.
    pub async fn swap(
        &self,
        command: SwapCommand,
        context: &OperationContext,
    ) -> AppResult<LedgerTransaction> {
        command.validate()?;
        self.execute(
            command.user_id,
            TransactionKind::Swap,
            (EntityKind::Wallet, command.source_wallet_id),
            (EntityKind::Wallet, command.destination_wallet_id),
            &command.amount,
            "Wallet swap".to_string(),
            context,
        )
        .await
    }

    /// The one canonical movement algorithm. `amount` is expressed in the
    /// source entity's currency; the destination is credited with the
    /// converted amount at the rate recorded on the ledger row.
    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
        source: (EntityKind, Uuid),
        destination: (EntityKind, Uuid),
        amount: &Amount,
        description: String,
        context: &OperationContext,
    ) -> AppResult<LedgerTransaction> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut source_entity = self
            .balances
            .load_for_update(&mut tx, user_id, source.0, source.1)
            .await?
            .ok_or(DomainError::EntityNotFound {
                kind: source.0,
                id: source.1,
            })?;
        let mut destination_entity = self
            .balances
            .load_for_update(&mut tx, user_id, destination.0, destination.1)
            .await?
            .ok_or(DomainError::EntityNotFound {
                kind: destination.0,
                id: destination.1,
            })?;

        // Sufficiency is checked inside debit, before any mutation persists
        source_entity.debit(amount)?;

        let rate = self
            .converter
            .get_exchange_rate(&source_entity.currency, &destination_entity.currency)
            .await?;
        let credited = credited_amount(amount, rate, &source_entity, &destination_entity)?;
        destination_entity.credit(&credited)?;

        self.balances.update_balance(&mut tx, &source_entity).await?;
        self.balances
            .update_balance(&mut tx, &destination_entity)
            .await?;

        let txn = LedgerTransaction::completed(
            user_id,
            kind,
            amount.value(),
            source_entity.currency.clone(),
            TransactionLeg::new(
                source_entity.id,
                source_entity.kind.into(),
                source_entity.currency.clone(),
            ),
            TransactionLeg::new(
                destination_entity.id,
                destination_entity.kind.into(),
                destination_entity.currency.clone(),
            ),
            rate,
            description,
        );
        self.ledger.insert(&mut tx, &txn).await?;

        tx.commit().await.map_err(AppError::from)?;

        tracing::info!(
            user_id = %user_id,
            reference = %txn.reference,
            kind = kind.as_str(),
            amount = %amount,
            correlation_id = ?context.correlation_id,
            "transfer completed"
        );

        notify::dispatch(
            self.notifier.clone(),
            NotificationEvent::TransferCompleted {
                user_id,
                kind,
                amount: amount.value(),
                currency: txn.currency.clone(),
                reference: txn.reference.clone(),
            },
        );

        Ok(txn)
    }
}

/// Amount credited to the destination after conversion. Conversion can
/// round a tiny cross-currency amount to zero; that is rejected rather
/// than recorded as a movement of nothing.
fn credited_amount(
    amount: &Amount,
    rate: Decimal,
    source: &BalanceEntity,
    destination: &BalanceEntity,
) -> Result<Amount, DomainError> {
    let converted = (amount.value() * rate).round_dp(8);
    if converted <= Decimal::ZERO {
        return Err(DomainError::Validation(format!(
            "amount too small to convert from {} to {}",
            source.currency, destination.currency
        )));
    }
    Ok(Amount::new(converted)?)
}
