//! Investment growth integration tests
//!
//! These tests require a database connection (DATABASE_URL) with the
//! schema from migrations/ applied. Run with: cargo test -- --ignored

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fincore::domain::{AccrualStep, Amount, InvestmentStatus, OperationContext, SkipReason};
use fincore::growth::{
    AccrualScheduler, CreateInvestmentCommand, GrowthAccrualProcessor, IncreaseInvestmentCommand,
};
use fincore::notify::LogNotifier;

mod common;

fn processor(pool: &sqlx::PgPool) -> GrowthAccrualProcessor {
    GrowthAccrualProcessor::new(pool.clone(), Arc::new(LogNotifier))
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_investment_debits_wallet_and_fixes_schedule() {
    let (pool, fixture) = common::setup_test_db().await;
    let processor = processor(&pool);

    let investment = processor
        .create_investment(
            CreateInvestmentCommand {
                user_id: fixture.user_id,
                wallet_id: fixture.wallet_usd,
                plan_id: uuid::Uuid::new_v4(),
                amount: Amount::new(dec!(400)).unwrap(),
                annual_rate: dec!(8),
                maturity_days: 30,
            },
            &OperationContext::new().with_request_user(fixture.user_id),
        )
        .await
        .expect("create failed");

    assert_eq!(investment.status, InvestmentStatus::Active);
    assert_eq!(investment.current_value, dec!(400));
    assert_eq!(investment.metadata.growth_schedule.len(), 30);
    assert_eq!(investment.metadata.next_growth_index, 0);

    // Schedule sums to principal * 8% * 30/365
    let sum: Decimal = investment.metadata.growth_schedule.iter().sum();
    let expected = (dec!(400) * dec!(8) * dec!(30) / (dec!(100) * dec!(365))).round_dp(8);
    assert_eq!(sum, expected);

    assert_eq!(common::balance_of(&pool, "wallets", fixture.wallet_usd).await, dec!(600));
    assert_eq!(common::transaction_count(&pool, fixture.user_id).await, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_daily_growth_is_idempotent_per_day() {
    let (pool, fixture) = common::setup_test_db().await;
    let processor = processor(&pool);

    let investment = processor
        .create_investment(
            CreateInvestmentCommand {
                user_id: fixture.user_id,
                wallet_id: fixture.wallet_usd,
                plan_id: uuid::Uuid::new_v4(),
                amount: Amount::new(dec!(1000)).unwrap(),
                annual_rate: dec!(8),
                maturity_days: 10,
            },
            &OperationContext::new().with_request_user(fixture.user_id),
        )
        .await
        .unwrap();

    let today = Utc::now();
    let first = processor
        .process_daily_growth(investment.id, today)
        .await
        .unwrap();
    let applied = match first {
        AccrualStep::Applied(applied) => applied,
        other => panic!("expected Applied, got {:?}", other),
    };
    assert_eq!(applied.previous_value, dec!(1000));
    assert_eq!(applied.new_value, dec!(1000) + applied.growth);

    // Second attempt the same day mutates nothing
    let second = processor
        .process_daily_growth(investment.id, today)
        .await
        .unwrap();
    assert!(matches!(
        second,
        AccrualStep::Skipped(SkipReason::AlreadyProcessed { .. })
    ));

    // Exactly one return row next to the funding row
    assert_eq!(common::transaction_count(&pool, fixture.user_id).await, 2);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_investment_matures_after_full_schedule() {
    let (pool, fixture) = common::setup_test_db().await;
    let processor = processor(&pool);

    let investment = processor
        .create_investment(
            CreateInvestmentCommand {
                user_id: fixture.user_id,
                wallet_id: fixture.wallet_usd,
                plan_id: uuid::Uuid::new_v4(),
                amount: Amount::new(dec!(500)).unwrap(),
                annual_rate: dec!(10),
                maturity_days: 5,
            },
            &OperationContext::new().with_request_user(fixture.user_id),
        )
        .await
        .unwrap();

    let mut day = Utc::now();
    for n in 1..=5 {
        let step = processor.process_daily_growth(investment.id, day).await.unwrap();
        match step {
            AccrualStep::Applied(applied) => assert_eq!(applied.matured, n == 5),
            other => panic!("day {}: expected Applied, got {:?}", n, other),
        }
        day += Duration::days(1);
    }

    let stored = fincore::store::InvestmentRepository::new(pool.clone())
        .get(fixture.user_id, investment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InvestmentStatus::Matured);
    assert_eq!(stored.metadata.next_growth_index, 5);

    // current value reconstructable from the schedule
    let expected: Decimal =
        dec!(500) + stored.metadata.growth_schedule.iter().sum::<Decimal>();
    assert_eq!(stored.current_value, expected);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_scheduler_isolates_per_investment_failures() {
    let (pool, fixture) = common::setup_test_db().await;
    let processor = Arc::new(processor(&pool));

    // One healthy investment
    processor
        .create_investment(
            CreateInvestmentCommand {
                user_id: fixture.user_id,
                wallet_id: fixture.wallet_usd,
                plan_id: uuid::Uuid::new_v4(),
                amount: Amount::new(dec!(100)).unwrap(),
                annual_rate: dec!(8),
                maturity_days: 30,
            },
            &OperationContext::new().with_request_user(fixture.user_id),
        )
        .await
        .unwrap();

    // One legacy record with no schedule: accrual must fail on it only
    sqlx::query(
        r#"
        INSERT INTO investments (
            id, user_id, plan_id, wallet_id, currency, annual_rate,
            amount, invested_amount, previous_value, current_value,
            invested_at, maturity_date, status, metadata, withdrawal_history
        )
        VALUES ($1, $2, $3, $4, 'USD', 8, 100, 100, 100, 100,
                NOW(), NOW() + INTERVAL '30 days', 'active',
                '{"growth_schedule": [], "last_growth_date": null, "next_growth_index": 0}',
                '[]')
        "#,
    )
    .bind(uuid::Uuid::new_v4())
    .bind(fixture.user_id)
    .bind(uuid::Uuid::new_v4())
    .bind(fixture.wallet_usd)
    .execute(&pool)
    .await
    .unwrap();

    let scheduler = AccrualScheduler::new(pool.clone(), processor.clone());
    let report = scheduler.run_once(Utc::now()).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.details.len(), 2);

    // Backfill repairs the legacy record; the next run processes it
    let backfill = processor.backfill_growth_schedules().await.unwrap();
    assert_eq!(backfill.repaired, 1);

    let report = scheduler.run_once(Utc::now() + Duration::days(1)).await;
    assert_eq!(report.failed, 0);
    assert_eq!(report.processed, 2);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_increase_then_withdraw_round_trip() {
    let (pool, fixture) = common::setup_test_db().await;
    let processor = processor(&pool);
    let context = OperationContext::new().with_request_user(fixture.user_id);

    let investment = processor
        .create_investment(
            CreateInvestmentCommand {
                user_id: fixture.user_id,
                wallet_id: fixture.wallet_usd,
                plan_id: uuid::Uuid::new_v4(),
                amount: Amount::new(dec!(300)).unwrap(),
                annual_rate: dec!(8),
                maturity_days: 20,
            },
            &context,
        )
        .await
        .unwrap();

    let increased = processor
        .increase_investment(
            IncreaseInvestmentCommand {
                user_id: fixture.user_id,
                investment_id: investment.id,
                amount: Amount::new(dec!(200)).unwrap(),
            },
            &context,
        )
        .await
        .unwrap();
    assert_eq!(increased.invested_amount, dec!(500));
    assert_eq!(increased.current_value, dec!(500));
    assert_eq!(common::balance_of(&pool, "wallets", fixture.wallet_usd).await, dec!(500));

    let withdrawn = processor
        .withdraw_investment(fixture.user_id, investment.id, &context)
        .await
        .unwrap();
    assert_eq!(withdrawn.status, InvestmentStatus::Withdrawn);
    assert_eq!(withdrawn.current_value, dec!(0));
    assert_eq!(withdrawn.withdrawal_history.len(), 1);

    // Principal plus increase is back in the wallet
    assert_eq!(common::balance_of(&pool, "wallets", fixture.wallet_usd).await, dec!(1000));
}
