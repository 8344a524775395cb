//! Investment repository
//!
//! The growth schedule and cursor are embedded in the row as JSONB, so
//! one investment's accrual state updates atomically without touching a
//! second collection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    CurrencyCode, GrowthMetadata, Investment, InvestmentStatus, WithdrawalRecord,
};

use super::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct InvestmentRow {
    id: Uuid,
    user_id: Uuid,
    plan_id: Uuid,
    wallet_id: Uuid,
    currency: String,
    annual_rate: Decimal,
    amount: Decimal,
    invested_amount: Decimal,
    previous_value: Decimal,
    current_value: Decimal,
    invested_at: DateTime<Utc>,
    maturity_date: DateTime<Utc>,
    status: String,
    metadata: serde_json::Value,
    withdrawal_history: serde_json::Value,
}

impl TryFrom<InvestmentRow> for Investment {
    type Error = StoreError;

    fn try_from(row: InvestmentRow) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::new(&row.currency)
            .map_err(|e| StoreError::Corrupt(format!("investment {}: {}", row.id, e)))?;
        let metadata: GrowthMetadata = serde_json::from_value(row.metadata)?;
        let withdrawal_history: Vec<WithdrawalRecord> =
            serde_json::from_value(row.withdrawal_history)?;

        Ok(Investment {
            id: row.id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            wallet_id: row.wallet_id,
            currency,
            annual_rate: row.annual_rate,
            amount: row.amount,
            invested_amount: row.invested_amount,
            previous_value: row.previous_value,
            current_value: row.current_value,
            invested_at: row.invested_at,
            maturity_date: row.maturity_date,
            status: InvestmentStatus::from(row.status.as_str()),
            metadata,
            withdrawal_history,
        })
    }
}

const COLUMNS: &str = "id, user_id, plan_id, wallet_id, currency, annual_rate, amount, \
     invested_amount, previous_value, current_value, invested_at, maturity_date, \
     status, metadata, withdrawal_history";

/// Repository for the investment collection
#[derive(Debug, Clone)]
pub struct InvestmentRepository {
    pool: PgPool,
}

impl InvestmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly opened investment inside the given unit of work.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        investment: &Investment,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO investments (
                id, user_id, plan_id, wallet_id, currency, annual_rate,
                amount, invested_amount, previous_value, current_value,
                invested_at, maturity_date, status, metadata, withdrawal_history
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(investment.id)
        .bind(investment.user_id)
        .bind(investment.plan_id)
        .bind(investment.wallet_id)
        .bind(investment.currency.as_str())
        .bind(investment.annual_rate)
        .bind(investment.amount)
        .bind(investment.invested_amount)
        .bind(investment.previous_value)
        .bind(investment.current_value)
        .bind(investment.invested_at)
        .bind(investment.maturity_date)
        .bind(investment.status.as_str())
        .bind(serde_json::to_value(&investment.metadata)?)
        .bind(serde_json::to_value(&investment.withdrawal_history)?)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Load with a row lock inside the given unit of work. System-level:
    /// not scoped to a user (the accrual driver owns no investments).
    pub async fn load_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Investment>, StoreError> {
        let sql = format!("SELECT {} FROM investments WHERE id = $1 FOR UPDATE", COLUMNS);
        let row: Option<InvestmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Investment::try_from).transpose()
    }

    /// Load with a row lock, scoped to the owning user.
    pub async fn load_owned_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Investment>, StoreError> {
        let sql = format!(
            "SELECT {} FROM investments WHERE id = $1 AND user_id = $2 FOR UPDATE",
            COLUMNS
        );
        let row: Option<InvestmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Investment::try_from).transpose()
    }

    /// Persist mutated value/status/metadata inside the given unit of work.
    pub async fn update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        investment: &Investment,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE investments
            SET invested_amount = $2,
                previous_value = $3,
                current_value = $4,
                status = $5,
                metadata = $6,
                withdrawal_history = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(investment.id)
        .bind(investment.invested_amount)
        .bind(investment.previous_value)
        .bind(investment.current_value)
        .bind(investment.status.as_str())
        .bind(serde_json::to_value(&investment.metadata)?)
        .bind(serde_json::to_value(&investment.withdrawal_history)?)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!(
                "investment {} vanished mid-transaction",
                investment.id
            )));
        }
        Ok(())
    }

    /// Plain read, scoped to the owning user.
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Investment>, StoreError> {
        let sql = format!(
            "SELECT {} FROM investments WHERE id = $1 AND user_id = $2",
            COLUMNS
        );
        let row: Option<InvestmentRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Investment::try_from).transpose()
    }

    /// IDs of investments due for the daily accrual run.
    pub async fn active_due_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM investments
            WHERE status = 'active' AND maturity_date > NOW()
            ORDER BY invested_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// IDs of active investments whose embedded schedule is missing.
    /// Targets of the explicit backfill migration.
    pub async fn ids_missing_schedule(&self) -> Result<Vec<Uuid>, StoreError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM investments
            WHERE status = 'active'
              AND jsonb_array_length(metadata->'growth_schedule') = 0
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
