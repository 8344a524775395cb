//! Growth Accrual Processor
//!
//! Investment lifecycle operations: open, increase, daily accrual,
//! withdrawal and the explicit schedule backfill migration. Each
//! operation is one unit of work; on any failure nothing persists.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    generate_reference, AccrualStep, Amount, DomainError, EntityKind, Investment,
    LedgerTransaction, LegKind, OperationContext, TransactionKind, TransactionLeg,
};
use crate::error::{AppError, AppResult};
use crate::notify::{self, NotificationEvent, Notifier};
use crate::store::{BalanceRepository, InvestmentRepository, LedgerRepository};

use super::schedule::{self, DEFAULT_VOLATILITY};

/// Command to open an investment funded from a wallet
#[derive(Debug, Clone)]
pub struct CreateInvestmentCommand {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub plan_id: Uuid,
    pub amount: Amount,
    /// Annual return rate, percent
    pub annual_rate: Decimal,
    pub maturity_days: u32,
}

impl CreateInvestmentCommand {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.annual_rate <= Decimal::ZERO {
            return Err(DomainError::Validation(
                "annual rate must be positive".to_string(),
            ));
        }
        if self.maturity_days == 0 {
            return Err(DomainError::Validation(
                "maturity must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

/// Command to add funds to an active investment
#[derive(Debug, Clone)]
pub struct IncreaseInvestmentCommand {
    pub user_id: Uuid,
    pub investment_id: Uuid,
    pub amount: Amount,
}

/// Report from the explicit schedule backfill migration
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BackfillReport {
    pub repaired: u32,
    pub failed: u32,
}

/// Applies investment lifecycle operations atomically
pub struct GrowthAccrualProcessor {
    pool: PgPool,
    balances: BalanceRepository,
    ledger: LedgerRepository,
    investments: InvestmentRepository,
    notifier: Arc<dyn Notifier>,
}

impl GrowthAccrualProcessor {
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            balances: BalanceRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool.clone()),
            investments: InvestmentRepository::new(pool.clone()),
            pool,
            notifier,
        }
    }

    /// Open an investment: debit the wallet, fix the growth schedule,
    /// record the funding transaction. One unit of work.
    pub async fn create_investment(
        &self,
        command: CreateInvestmentCommand,
        _context: &OperationContext,
    ) -> AppResult<Investment> {
        command.validate()?;

        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut wallet = self
            .balances
            .load_for_update(&mut tx, command.user_id, EntityKind::Wallet, command.wallet_id)
            .await?
            .ok_or(DomainError::EntityNotFound {
                kind: EntityKind::Wallet,
                id: command.wallet_id,
            })?;

        wallet.debit(&command.amount)?;

        let growth_schedule = schedule::generate(
            command.amount.value(),
            command.annual_rate,
            command.maturity_days,
            DEFAULT_VOLATILITY,
        );
        let investment = Investment::open(
            command.user_id,
            command.plan_id,
            command.wallet_id,
            wallet.currency.clone(),
            command.amount.value(),
            command.annual_rate,
            command.maturity_days,
            growth_schedule,
        );

        self.balances.update_balance(&mut tx, &wallet).await?;
        self.investments.insert(&mut tx, &investment).await?;

        let txn = LedgerTransaction::completed(
            command.user_id,
            TransactionKind::Investment,
            command.amount.value(),
            wallet.currency.clone(),
            TransactionLeg::new(wallet.id, wallet.kind.into(), wallet.currency.clone()),
            TransactionLeg::new(investment.id, LegKind::Investment, investment.currency.clone()),
            Decimal::ONE,
            "Investment funding".to_string(),
        );
        self.ledger.insert(&mut tx, &txn).await?;

        tx.commit().await.map_err(AppError::from)?;

        tracing::info!(
            user_id = %command.user_id,
            investment_id = %investment.id,
            amount = %command.amount,
            maturity_days = command.maturity_days,
            "investment opened"
        );

        notify::dispatch(
            self.notifier.clone(),
            NotificationEvent::InvestmentOpened {
                user_id: command.user_id,
                investment_id: investment.id,
                amount: command.amount.value(),
            },
        );

        Ok(investment)
    }

    /// Add funds to an active investment. The increase is debited from
    /// the wallet and a pro-rated schedule for it is folded into the
    /// un-accrued tail.
    pub async fn increase_investment(
        &self,
        command: IncreaseInvestmentCommand,
        _context: &OperationContext,
    ) -> AppResult<Investment> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut investment = self
            .investments
            .load_owned_for_update(&mut tx, command.user_id, command.investment_id)
            .await?
            .ok_or(DomainError::InvestmentNotFound(command.investment_id))?;

        let remaining = investment.remaining_days();
        if remaining == 0 {
            return Err(DomainError::InvestmentNotActive {
                id: investment.id,
                status: investment.status.as_str().to_string(),
            }
            .into());
        }

        let mut wallet = self
            .balances
            .load_for_update(&mut tx, command.user_id, EntityKind::Wallet, investment.wallet_id)
            .await?
            .ok_or(DomainError::EntityNotFound {
                kind: EntityKind::Wallet,
                id: investment.wallet_id,
            })?;

        wallet.debit(&command.amount)?;

        let boost = schedule::generate(
            command.amount.value(),
            investment.annual_rate,
            remaining as u32,
            DEFAULT_VOLATILITY,
        );
        investment.fold_increase(command.amount.value(), &boost)?;

        self.balances.update_balance(&mut tx, &wallet).await?;
        self.investments.update(&mut tx, &investment).await?;

        let txn = LedgerTransaction::completed(
            command.user_id,
            TransactionKind::InvestmentIncrease,
            command.amount.value(),
            wallet.currency.clone(),
            TransactionLeg::new(wallet.id, wallet.kind.into(), wallet.currency.clone()),
            TransactionLeg::new(investment.id, LegKind::Investment, investment.currency.clone()),
            Decimal::ONE,
            "Investment increase".to_string(),
        );
        self.ledger.insert(&mut tx, &txn).await?;

        tx.commit().await.map_err(AppError::from)?;

        tracing::info!(
            user_id = %command.user_id,
            investment_id = %investment.id,
            amount = %command.amount,
            "investment increased"
        );

        Ok(investment)
    }

    /// Apply one day's scheduled growth to one investment, idempotently
    /// per calendar day. Skips are Ok values, not errors.
    pub async fn process_daily_growth(
        &self,
        investment_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> AppResult<AccrualStep> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut investment = self
            .investments
            .load_for_update(&mut tx, investment_id)
            .await?
            .ok_or(DomainError::InvestmentNotFound(investment_id))?;

        let step = investment.accrue_daily(as_of.date_naive())?;

        let application = match &step {
            AccrualStep::Skipped(_) => {
                // Nothing mutated; discard the unit of work
                return Ok(step);
            }
            AccrualStep::Applied(application) => application.clone(),
        };

        let description = if application.growth >= Decimal::ZERO {
            "Daily growth"
        } else {
            "Daily fluctuation"
        };
        let txn = LedgerTransaction::completed(
            investment.user_id,
            TransactionKind::Return,
            application.growth.abs(),
            investment.currency.clone(),
            TransactionLeg::new(investment.id, LegKind::Investment, investment.currency.clone()),
            TransactionLeg::new(investment.id, LegKind::Investment, investment.currency.clone()),
            Decimal::ONE,
            description.to_string(),
        );
        self.ledger.insert(&mut tx, &txn).await?;
        self.investments.update(&mut tx, &investment).await?;

        tx.commit().await.map_err(AppError::from)?;

        tracing::debug!(
            investment_id = %investment_id,
            growth = %application.growth,
            new_value = %application.new_value,
            matured = application.matured,
            "daily growth applied"
        );

        notify::dispatch(
            self.notifier.clone(),
            NotificationEvent::GrowthApplied {
                user_id: investment.user_id,
                investment_id,
                growth: application.growth,
                matured: application.matured,
            },
        );

        Ok(step)
    }

    /// Withdraw the full current value back to the source wallet.
    /// Allowed from active or matured investments.
    pub async fn withdraw_investment(
        &self,
        user_id: Uuid,
        investment_id: Uuid,
        _context: &OperationContext,
    ) -> AppResult<Investment> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut investment = self
            .investments
            .load_owned_for_update(&mut tx, user_id, investment_id)
            .await?
            .ok_or(DomainError::InvestmentNotFound(investment_id))?;

        let mut wallet = self
            .balances
            .load_for_update(&mut tx, user_id, EntityKind::Wallet, investment.wallet_id)
            .await?
            .ok_or(DomainError::EntityNotFound {
                kind: EntityKind::Wallet,
                id: investment.wallet_id,
            })?;

        let reference = generate_reference(TransactionKind::InvestmentWithdrawal);
        let withdrawn = investment.withdraw_all(reference.clone(), Utc::now())?;
        wallet.credit(&Amount::new(withdrawn).map_err(DomainError::from)?)?;

        self.balances.update_balance(&mut tx, &wallet).await?;
        self.investments.update(&mut tx, &investment).await?;

        let mut txn = LedgerTransaction::completed(
            user_id,
            TransactionKind::InvestmentWithdrawal,
            withdrawn,
            investment.currency.clone(),
            TransactionLeg::new(investment.id, LegKind::Investment, investment.currency.clone()),
            TransactionLeg::new(wallet.id, wallet.kind.into(), wallet.currency.clone()),
            Decimal::ONE,
            "Investment withdrawal".to_string(),
        );
        // The withdrawal record and ledger row share one reference
        txn.reference = reference;
        self.ledger.insert(&mut tx, &txn).await?;

        tx.commit().await.map_err(AppError::from)?;

        tracing::info!(
            user_id = %user_id,
            investment_id = %investment_id,
            amount = %withdrawn,
            "investment withdrawn"
        );

        notify::dispatch(
            self.notifier.clone(),
            NotificationEvent::InvestmentWithdrawn {
                user_id,
                investment_id,
                amount: withdrawn,
            },
        );

        Ok(investment)
    }

    /// Explicit migration: synthesize schedules for legacy records that
    /// have none, over the whole days between inception and maturity.
    /// The accrual hot path never does this silently.
    pub async fn backfill_growth_schedules(&self) -> AppResult<BackfillReport> {
        let ids = self.investments.ids_missing_schedule().await?;
        let mut report = BackfillReport::default();

        for id in ids {
            match self.backfill_one(id).await {
                Ok(()) => report.repaired += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(investment_id = %id, error = %e, "schedule backfill failed");
                }
            }
        }

        if report.repaired > 0 {
            tracing::info!(
                repaired = report.repaired,
                failed = report.failed,
                "growth schedule backfill completed"
            );
        }
        Ok(report)
    }

    async fn backfill_one(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let mut investment = self
            .investments
            .load_for_update(&mut tx, id)
            .await?
            .ok_or(DomainError::InvestmentNotFound(id))?;

        if investment.has_schedule() {
            // Repaired concurrently; nothing to do
            return Ok(());
        }

        let days = investment.maturity_days().max(1) as u32;
        investment.metadata.growth_schedule = schedule::generate(
            investment.invested_amount,
            investment.annual_rate,
            days,
            DEFAULT_VOLATILITY,
        );
        self.investments.update(&mut tx, &investment).await?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }
}
