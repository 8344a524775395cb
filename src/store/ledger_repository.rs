//! Ledger transaction repository
//!
//! Append-mostly collection of completed money movements.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    CurrencyCode, LedgerTransaction, LegKind, TransactionKind, TransactionLeg, TransactionStatus,
};

use super::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    amount: Decimal,
    currency: String,
    source_id: Uuid,
    source_kind: String,
    source_currency: String,
    destination_id: Uuid,
    destination_kind: String,
    destination_currency: String,
    conversion_rate: Decimal,
    status: String,
    reference: String,
    fee: Option<Decimal>,
    description: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerTransaction {
    type Error = StoreError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::CurrencyError| {
            StoreError::Corrupt(format!("transaction {}: {}", row.id, e))
        };
        Ok(LedgerTransaction {
            id: row.id,
            user_id: row.user_id,
            kind: TransactionKind::from(row.kind.as_str()),
            amount: row.amount,
            currency: CurrencyCode::new(&row.currency).map_err(corrupt)?,
            source: TransactionLeg::new(
                row.source_id,
                LegKind::from(row.source_kind.as_str()),
                CurrencyCode::new(&row.source_currency).map_err(corrupt)?,
            ),
            destination: TransactionLeg::new(
                row.destination_id,
                LegKind::from(row.destination_kind.as_str()),
                CurrencyCode::new(&row.destination_currency).map_err(corrupt)?,
            ),
            conversion_rate: row.conversion_rate,
            status: TransactionStatus::from(row.status.as_str()),
            reference: row.reference,
            fee: row.fee,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

/// Repository for the ledger-transaction collection
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a transaction record inside the given unit of work.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        txn: &LedgerTransaction,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_transactions (
                id, user_id, kind, amount, currency,
                source_id, source_kind, source_currency,
                destination_id, destination_kind, destination_currency,
                conversion_rate, status, reference, fee, description, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(txn.id)
        .bind(txn.user_id)
        .bind(txn.kind.as_str())
        .bind(txn.amount)
        .bind(txn.currency.as_str())
        .bind(txn.source.entity_id)
        .bind(txn.source.kind.as_str())
        .bind(txn.source.currency.as_str())
        .bind(txn.destination.entity_id)
        .bind(txn.destination.kind.as_str())
        .bind(txn.destination.currency.as_str())
        .bind(txn.conversion_rate)
        .bind(txn.status.as_str())
        .bind(&txn.reference)
        .bind(txn.fee)
        .bind(&txn.description)
        .bind(txn.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Most recent transactions for a user.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        let rows: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, kind, amount, currency,
                   source_id, source_kind, source_currency,
                   destination_id, destination_kind, destination_currency,
                   conversion_rate, status, reference, fee, description, created_at
            FROM ledger_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerTransaction::try_from).collect()
    }
}
