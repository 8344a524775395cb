//! Common test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use fincore::fx::{CurrencyConverter, StaticRateProvider};

/// Entity ids seeded for one test user
pub struct Fixture {
    pub user_id: Uuid,
    /// USD wallet
    pub wallet_usd: Uuid,
    /// EUR wallet
    pub wallet_eur: Uuid,
    /// USD account
    pub account_id: Uuid,
    /// USD card
    pub card_id: Uuid,
}

/// Setup test database: truncate tables and seed one user with a USD
/// wallet (1000), a EUR wallet (500), a USD account (2000) and a USD
/// card (300).
pub async fn setup_test_db() -> (PgPool, Fixture) {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let mut tx = pool.begin().await.expect("Failed to begin transaction");

    sqlx::query("TRUNCATE TABLE wallets, accounts, cards, ledger_transactions, investments CASCADE")
        .execute(&mut *tx)
        .await
        .expect("Failed to clean up DB");

    let fixture = Fixture {
        user_id: Uuid::new_v4(),
        wallet_usd: Uuid::new_v4(),
        wallet_eur: Uuid::new_v4(),
        account_id: Uuid::new_v4(),
        card_id: Uuid::new_v4(),
    };

    seed_entity(&mut tx, "wallets", fixture.wallet_usd, fixture.user_id, "USD", dec!(1000)).await;
    seed_entity(&mut tx, "wallets", fixture.wallet_eur, fixture.user_id, "EUR", dec!(500)).await;
    seed_entity(&mut tx, "accounts", fixture.account_id, fixture.user_id, "USD", dec!(2000)).await;
    seed_entity(&mut tx, "cards", fixture.card_id, fixture.user_id, "USD", dec!(300)).await;

    tx.commit().await.expect("Failed to commit seed data");

    (pool, fixture)
}

async fn seed_entity(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    table: &str,
    id: Uuid,
    user_id: Uuid,
    currency: &str,
    balance: Decimal,
) {
    let sql = format!(
        "INSERT INTO {} (id, user_id, currency, balance, ledger_balance, status) \
         VALUES ($1, $2, $3, $4, $4, 'active')",
        table
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(user_id)
        .bind(currency)
        .bind(balance)
        .execute(&mut **tx)
        .await
        .unwrap_or_else(|e| panic!("Failed to seed {}: {}", table, e));
}

/// Converter backed by a fixed table; no network in tests.
/// USD = 1, EUR = 0.92 per USD, NGN = 1500 per USD.
pub fn static_converter() -> CurrencyConverter {
    let mut rates = HashMap::new();
    rates.insert("USD".to_string(), dec!(1));
    rates.insert("EUR".to_string(), dec!(0.92));
    rates.insert("NGN".to_string(), dec!(1500));
    CurrencyConverter::new(
        Arc::new(StaticRateProvider::new(rates)),
        Duration::from_secs(3600),
    )
}

/// Fetch a balance straight from the database
pub async fn balance_of(pool: &PgPool, table: &str, id: Uuid) -> Decimal {
    let sql = format!("SELECT balance FROM {} WHERE id = $1", table);
    sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("balance lookup failed")
}

/// Count ledger transactions for a user
pub async fn transaction_count(pool: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM ledger_transactions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("transaction count failed")
}
