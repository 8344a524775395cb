//! Investment aggregate
//!
//! An investment carries its growth schedule inline as metadata: an
//! ordered sequence of per-day signed return amounts, a cursor into it,
//! and the calendar day of the last applied accrual. One investment's
//! accrual state is therefore updated atomically, without a
//! cross-collection join.
//!
//! State transitions are pure; the processor persists them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::currency::CurrencyCode;
use super::error::DomainError;

/// Investment lifecycle status. Transitions only move forward:
/// active -> matured (cursor reaches schedule end), active|matured -> withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Active,
    Matured,
    Withdrawn,
    Cancelled,
}

impl InvestmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStatus::Active => "active",
            InvestmentStatus::Matured => "matured",
            InvestmentStatus::Withdrawn => "withdrawn",
            InvestmentStatus::Cancelled => "cancelled",
        }
    }
}

impl From<&str> for InvestmentStatus {
    fn from(s: &str) -> Self {
        match s {
            "matured" => InvestmentStatus::Matured,
            "withdrawn" => InvestmentStatus::Withdrawn,
            "cancelled" => InvestmentStatus::Cancelled,
            _ => InvestmentStatus::Active,
        }
    }
}

/// Accrual state embedded in the investment record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowthMetadata {
    /// Per-day signed return amounts; length equals maturity days
    pub growth_schedule: Vec<Decimal>,
    /// Calendar day of the last applied accrual
    pub last_growth_date: Option<NaiveDate>,
    /// 0-based cursor into the schedule; monotonically non-decreasing
    pub next_growth_index: usize,
}

/// A manual withdrawal taken from the investment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRecord {
    pub amount: Decimal,
    pub reference: String,
    pub withdrawn_at: DateTime<Utc>,
}

/// Why a daily accrual was skipped without mutating state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Growth for this calendar day was already applied
    AlreadyProcessed { date: NaiveDate },
    /// The schedule cursor has reached the end
    Matured,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyProcessed { .. } => "already processed today",
            SkipReason::Matured => "matured",
        }
    }
}

/// Result of one applied daily accrual
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthApplication {
    pub growth: Decimal,
    pub previous_value: Decimal,
    pub new_value: Decimal,
    pub matured: bool,
}

/// Outcome of a daily accrual attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AccrualStep {
    Applied(GrowthApplication),
    Skipped(SkipReason),
}

/// An investment owned by one user, funded from one wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    /// Wallet the principal was debited from; withdrawals credit it back
    pub wallet_id: Uuid,
    pub currency: CurrencyCode,
    /// Annual return rate, percent (8 means 8%)
    pub annual_rate: Decimal,
    /// Original principal
    pub amount: Decimal,
    /// Principal plus any later increases
    pub invested_amount: Decimal,
    pub previous_value: Decimal,
    pub current_value: Decimal,
    pub invested_at: DateTime<Utc>,
    pub maturity_date: DateTime<Utc>,
    pub status: InvestmentStatus,
    pub metadata: GrowthMetadata,
    pub withdrawal_history: Vec<WithdrawalRecord>,
}

impl Investment {
    /// Open a new investment with its growth schedule fixed up front.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        user_id: Uuid,
        plan_id: Uuid,
        wallet_id: Uuid,
        currency: CurrencyCode,
        principal: Decimal,
        annual_rate: Decimal,
        maturity_days: u32,
        schedule: Vec<Decimal>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            wallet_id,
            currency,
            annual_rate,
            amount: principal,
            invested_amount: principal,
            previous_value: principal,
            current_value: principal,
            invested_at: now,
            maturity_date: now + chrono::Duration::days(i64::from(maturity_days)),
            status: InvestmentStatus::Active,
            metadata: GrowthMetadata {
                growth_schedule: schedule,
                last_growth_date: None,
                next_growth_index: 0,
            },
            withdrawal_history: Vec::new(),
        }
    }

    pub fn has_schedule(&self) -> bool {
        !self.metadata.growth_schedule.is_empty()
    }

    /// Whole days between inception and maturity
    pub fn maturity_days(&self) -> i64 {
        (self.maturity_date - self.invested_at).num_days()
    }

    /// Schedule days not yet applied
    pub fn remaining_days(&self) -> usize {
        self.metadata
            .growth_schedule
            .len()
            .saturating_sub(self.metadata.next_growth_index)
    }

    /// Apply one day's scheduled growth, idempotently per calendar day.
    ///
    /// Skips (without mutating) when the day was already processed or the
    /// schedule is exhausted. Fails with `InvariantViolation` when the
    /// schedule is missing; legacy records must be repaired through the
    /// explicit backfill operation, not here.
    pub fn accrue_daily(&mut self, as_of: NaiveDate) -> Result<AccrualStep, DomainError> {
        match self.status {
            InvestmentStatus::Active => {}
            InvestmentStatus::Matured => return Ok(AccrualStep::Skipped(SkipReason::Matured)),
            status => {
                return Err(DomainError::InvestmentNotActive {
                    id: self.id,
                    status: status.as_str().to_string(),
                })
            }
        }

        if !self.has_schedule() {
            return Err(DomainError::InvariantViolation(format!(
                "investment {} has no growth schedule",
                self.id
            )));
        }

        if self.metadata.last_growth_date == Some(as_of) {
            return Ok(AccrualStep::Skipped(SkipReason::AlreadyProcessed {
                date: as_of,
            }));
        }

        let schedule_len = self.metadata.growth_schedule.len();
        if self.metadata.next_growth_index >= schedule_len {
            // Cursor at the end but status still active: close it out.
            self.status = InvestmentStatus::Matured;
            return Ok(AccrualStep::Skipped(SkipReason::Matured));
        }

        let growth = self.metadata.growth_schedule[self.metadata.next_growth_index];
        self.previous_value = self.current_value;
        self.current_value += growth;
        self.metadata.next_growth_index += 1;
        self.metadata.last_growth_date = Some(as_of);

        let matured = self.metadata.next_growth_index == schedule_len;
        if matured {
            self.status = InvestmentStatus::Matured;
        }

        Ok(AccrualStep::Applied(GrowthApplication {
            growth,
            previous_value: self.previous_value,
            new_value: self.current_value,
            matured,
        }))
    }

    /// Fold an increase into the principal. The boost schedule (one entry
    /// per remaining day) is added element-wise to the un-accrued tail.
    pub fn fold_increase(&mut self, amount: Decimal, boost: &[Decimal]) -> Result<(), DomainError> {
        if self.status != InvestmentStatus::Active {
            return Err(DomainError::InvestmentNotActive {
                id: self.id,
                status: self.status.as_str().to_string(),
            });
        }
        if boost.len() != self.remaining_days() {
            return Err(DomainError::InvariantViolation(format!(
                "boost schedule covers {} days, {} remain",
                boost.len(),
                self.remaining_days()
            )));
        }

        self.invested_amount += amount;
        self.previous_value = self.current_value;
        self.current_value += amount;

        let cursor = self.metadata.next_growth_index;
        for (slot, extra) in self.metadata.growth_schedule[cursor..]
            .iter_mut()
            .zip(boost)
        {
            *slot += *extra;
        }
        Ok(())
    }

    /// Withdraw the full current value. Allowed from active or matured.
    /// Returns the withdrawn amount.
    pub fn withdraw_all(
        &mut self,
        reference: String,
        at: DateTime<Utc>,
    ) -> Result<Decimal, DomainError> {
        match self.status {
            InvestmentStatus::Active | InvestmentStatus::Matured => {}
            status => {
                return Err(DomainError::InvestmentNotActive {
                    id: self.id,
                    status: status.as_str().to_string(),
                })
            }
        }

        let withdrawn = self.current_value;
        if withdrawn <= Decimal::ZERO {
            return Err(DomainError::Validation(
                "investment has no value to withdraw".to_string(),
            ));
        }

        self.previous_value = self.current_value;
        self.current_value = Decimal::ZERO;
        self.status = InvestmentStatus::Withdrawn;
        self.withdrawal_history.push(WithdrawalRecord {
            amount: withdrawn,
            reference,
            withdrawn_at: at,
        });

        Ok(withdrawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn investment_with_schedule(principal: Decimal, schedule: Vec<Decimal>) -> Investment {
        let days = schedule.len() as u32;
        Investment::open(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            CurrencyCode::usd(),
            principal,
            dec!(8),
            days,
            schedule,
        )
    }

    #[test]
    fn test_accrual_applies_scheduled_growth() {
        let mut inv = investment_with_schedule(dec!(1000), vec![dec!(0.5), dec!(-0.1), dec!(0.3)]);
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        let step = inv.accrue_daily(day).unwrap();
        match step {
            AccrualStep::Applied(app) => {
                assert_eq!(app.growth, dec!(0.5));
                assert_eq!(app.previous_value, dec!(1000));
                assert_eq!(app.new_value, dec!(1000.5));
                assert!(!app.matured);
            }
            other => panic!("expected Applied, got {:?}", other),
        }
        assert_eq!(inv.metadata.next_growth_index, 1);
        assert_eq!(inv.metadata.last_growth_date, Some(day));
    }

    #[test]
    fn test_accrual_idempotent_per_day() {
        let mut inv = investment_with_schedule(dec!(1000), vec![dec!(1), dec!(1)]);
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        assert!(matches!(
            inv.accrue_daily(day).unwrap(),
            AccrualStep::Applied(_)
        ));
        let second = inv.accrue_daily(day).unwrap();
        assert!(matches!(
            second,
            AccrualStep::Skipped(SkipReason::AlreadyProcessed { .. })
        ));
        // No state moved on the second attempt
        assert_eq!(inv.metadata.next_growth_index, 1);
        assert_eq!(inv.current_value, dec!(1001));
    }

    #[test]
    fn test_cursor_monotone_and_value_reconstructable() {
        let schedule = vec![dec!(0.25), dec!(-0.05), dec!(0.4), dec!(0.1)];
        let mut inv = investment_with_schedule(dec!(500), schedule.clone());

        let mut day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        for n in 1..=schedule.len() {
            inv.accrue_daily(day).unwrap();
            assert_eq!(inv.metadata.next_growth_index, n);
            let expected: Decimal = dec!(500) + schedule[..n].iter().sum::<Decimal>();
            assert_eq!(inv.current_value, expected);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_matures_after_exactly_schedule_len_accruals() {
        let mut inv = investment_with_schedule(dec!(100), vec![dec!(1), dec!(2), dec!(3)]);
        let mut day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();

        for _ in 0..2 {
            inv.accrue_daily(day).unwrap();
            assert_eq!(inv.status, InvestmentStatus::Active);
            day = day.succ_opt().unwrap();
        }

        let last = inv.accrue_daily(day).unwrap();
        match last {
            AccrualStep::Applied(app) => assert!(app.matured),
            other => panic!("expected Applied, got {:?}", other),
        }
        assert_eq!(inv.status, InvestmentStatus::Matured);
        assert_eq!(inv.current_value, dec!(106));

        // Further accruals skip
        let after = inv.accrue_daily(day.succ_opt().unwrap()).unwrap();
        assert!(matches!(after, AccrualStep::Skipped(SkipReason::Matured)));
    }

    #[test]
    fn test_missing_schedule_is_invariant_violation() {
        let mut inv = investment_with_schedule(dec!(100), vec![]);
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        let result = inv.accrue_daily(day);
        assert!(matches!(
            result,
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_fold_increase_boosts_tail() {
        let mut inv = investment_with_schedule(dec!(1000), vec![dec!(1), dec!(1), dec!(1)]);
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        inv.accrue_daily(day).unwrap();

        inv.fold_increase(dec!(500), &[dec!(0.5), dec!(0.5)]).unwrap();

        assert_eq!(inv.invested_amount, dec!(1500));
        assert_eq!(inv.current_value, dec!(1501));
        assert_eq!(inv.metadata.growth_schedule, vec![dec!(1), dec!(1.5), dec!(1.5)]);
    }

    #[test]
    fn test_fold_increase_rejects_wrong_boost_length() {
        let mut inv = investment_with_schedule(dec!(1000), vec![dec!(1), dec!(1)]);
        let result = inv.fold_increase(dec!(100), &[dec!(0.5)]);
        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn test_withdraw_from_active_and_matured() {
        let mut active = investment_with_schedule(dec!(200), vec![dec!(1)]);
        let withdrawn = active
            .withdraw_all("IWD-1-000001".to_string(), Utc::now())
            .unwrap();
        assert_eq!(withdrawn, dec!(200));
        assert_eq!(active.status, InvestmentStatus::Withdrawn);
        assert_eq!(active.current_value, dec!(0));
        assert_eq!(active.withdrawal_history.len(), 1);

        // Withdrawing again is rejected
        let again = active.withdraw_all("IWD-1-000002".to_string(), Utc::now());
        assert!(matches!(
            again,
            Err(DomainError::InvestmentNotActive { .. })
        ));
    }
}
