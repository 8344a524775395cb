//! Balance entity repository
//!
//! Wallets, accounts and cards live in three collections with one shape.
//! `load_for_update` takes a row lock so concurrent debits against the
//! same entity serialize inside the datastore, not in application code.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Balance, BalanceEntity, CurrencyCode, EntityKind, EntityStatus};

use super::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct BalanceRow {
    id: Uuid,
    user_id: Uuid,
    currency: String,
    balance: Decimal,
    ledger_balance: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl BalanceRow {
    fn into_entity(self, kind: EntityKind) -> Result<BalanceEntity, StoreError> {
        let currency = CurrencyCode::new(&self.currency)
            .map_err(|e| StoreError::Corrupt(format!("{} {}: {}", kind, self.id, e)))?;
        let balance = Balance::new(self.balance)
            .map_err(|e| StoreError::Corrupt(format!("{} {}: {}", kind, self.id, e)))?;
        let ledger_balance = Balance::new(self.ledger_balance)
            .map_err(|e| StoreError::Corrupt(format!("{} {}: {}", kind, self.id, e)))?;

        Ok(BalanceEntity {
            id: self.id,
            user_id: self.user_id,
            kind,
            currency,
            balance,
            ledger_balance,
            status: EntityStatus::from(self.status.as_str()),
            created_at: self.created_at,
        })
    }
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Wallet => "wallets",
        EntityKind::Account => "accounts",
        EntityKind::Card => "cards",
    }
}

const COLUMNS: &str = "id, user_id, currency, balance, ledger_balance, status, created_at";

/// Repository for the three balance-entity collections
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    pool: PgPool,
}

impl BalanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Plain read, scoped to the owning user.
    pub async fn get(
        &self,
        user_id: Uuid,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<BalanceEntity>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND user_id = $2",
            COLUMNS,
            table(kind)
        );
        let row: Option<BalanceRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_entity(kind)).transpose()
    }

    /// Load with a row lock inside the given unit of work, scoped to the
    /// owning user. Returns None when absent or owned by someone else.
    pub async fn load_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<BalanceEntity>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 AND user_id = $2 FOR UPDATE",
            COLUMNS,
            table(kind)
        );
        let row: Option<BalanceRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(|r| r.into_entity(kind)).transpose()
    }

    /// Persist mutated balances inside the given unit of work.
    pub async fn update_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entity: &BalanceEntity,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE {} SET balance = $2, ledger_balance = $3, updated_at = NOW() WHERE id = $1",
            table(entity.kind)
        );
        let result = sqlx::query(&sql)
            .bind(entity.id)
            .bind(entity.balance.value())
            .bind(entity.ledger_balance.value())
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!(
                "{} {} vanished mid-transaction",
                entity.kind, entity.id
            )));
        }
        Ok(())
    }

    /// All balance entities owned by a user, across the three collections.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<BalanceEntity>, StoreError> {
        let mut entities = Vec::new();
        for kind in [EntityKind::Wallet, EntityKind::Account, EntityKind::Card] {
            let sql = format!(
                "SELECT {} FROM {} WHERE user_id = $1 ORDER BY created_at",
                COLUMNS,
                table(kind)
            );
            let rows: Vec<BalanceRow> = sqlx::query_as(&sql)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
            for row in rows {
                entities.push(row.into_entity(kind)?);
            }
        }
        Ok(entities)
    }
}
