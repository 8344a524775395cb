//! API Routes
//!
//! HTTP endpoint definitions over the exposed ledger and accrual
//! operations.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AccrualStep, Amount, BalanceEntity, DomainError, Investment, LedgerTransaction,
    OperationContext,
};
use crate::engine::{Counterparty, DepositCommand, SwapCommand, TransferEngine, WithdrawCommand};
use crate::error::AppError;
use crate::growth::{
    AccrualScheduler, BackfillReport, CreateInvestmentCommand, GrowthAccrualProcessor,
    GrowthRunReport, IncreaseInvestmentCommand,
};
use crate::store::{BalanceRepository, InvestmentRepository, LedgerRepository};

use super::middleware::RequestUser;
use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub wallet_id: Uuid,
    /// Amount as string for precise decimals
    pub amount: String,
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub card_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub wallet_id: Uuid,
    pub amount: String,
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub card_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub source_wallet_id: Uuid,
    pub destination_wallet_id: Uuid,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvestmentRequest {
    pub wallet_id: Uuid,
    pub plan_id: Uuid,
    pub amount: String,
    /// Annual return rate, percent
    pub annual_rate: Decimal,
    pub maturity_days: u32,
}

#[derive(Debug, Deserialize)]
pub struct IncreaseInvestmentRequest {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// Outcome of a manual single-investment growth trigger
#[derive(Debug, Serialize)]
pub struct GrowthOutcomeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Decimal>,
    pub matured: bool,
}

impl From<AccrualStep> for GrowthOutcomeResponse {
    fn from(step: AccrualStep) -> Self {
        match step {
            AccrualStep::Applied(application) => Self {
                success: true,
                reason: None,
                growth: Some(application.growth),
                previous_value: Some(application.previous_value),
                new_value: Some(application.new_value),
                matured: application.matured,
            },
            AccrualStep::Skipped(reason) => Self {
                success: false,
                reason: Some(reason.as_str().to_string()),
                growth: None,
                previous_value: None,
                new_value: None,
                matured: matches!(reason, crate::domain::SkipReason::Matured),
            },
        }
    }
}

fn parse_amount(raw: &str) -> Result<Amount, AppError> {
    raw.parse()
        .map_err(|e| AppError::InvalidRequest(format!("Invalid amount: {}", e)))
}

fn context_for(user: RequestUser) -> OperationContext {
    let mut context = OperationContext::new().with_request_user(user.0);
    context.ensure_correlation_id();
    context
}

// =========================================================================
// Router
// =========================================================================

/// Create the API router with all routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Transfers
        .route("/transfers/withdraw", post(withdraw))
        .route("/transfers/deposit", post(deposit))
        .route("/transfers/swap", post(swap))
        // Reads
        .route("/balances", get(list_balances))
        .route("/transactions", get(list_transactions))
        // Investments
        .route("/investments", post(create_investment))
        .route("/investments/:id", get(get_investment))
        .route("/investments/:id/increase", post(increase_investment))
        .route("/investments/:id/withdraw", post(withdraw_investment))
        .route("/investments/:id/growth", post(trigger_growth))
        // Operational
        .route("/growth/run", post(run_all_growth))
        .route("/growth/backfill", post(backfill_schedules))
}

// =========================================================================
// Transfer handlers
// =========================================================================

async fn withdraw(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<LedgerTransaction>, AppError> {
    let command = WithdrawCommand {
        user_id: user.0,
        wallet_id: request.wallet_id,
        amount: parse_amount(&request.amount)?,
        destination: Counterparty::from_options(request.account_id, request.card_id)?,
    };

    let engine = TransferEngine::new(state.pool, state.converter, state.notifier);
    let txn = engine.withdraw(command, &context_for(user)).await?;
    Ok(Json(txn))
}

async fn deposit(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<LedgerTransaction>, AppError> {
    let command = DepositCommand {
        user_id: user.0,
        wallet_id: request.wallet_id,
        amount: parse_amount(&request.amount)?,
        source: Counterparty::from_options(request.account_id, request.card_id)?,
    };

    let engine = TransferEngine::new(state.pool, state.converter, state.notifier);
    let txn = engine.deposit(command, &context_for(user)).await?;
    Ok(Json(txn))
}

async fn swap(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Json(request): Json<SwapRequest>,
) -> Result<Json<LedgerTransaction>, AppError> {
    let command = SwapCommand {
        user_id: user.0,
        source_wallet_id: request.source_wallet_id,
        destination_wallet_id: request.destination_wallet_id,
        amount: parse_amount(&request.amount)?,
    };

    let engine = TransferEngine::new(state.pool, state.converter, state.notifier);
    let txn = engine.swap(command, &context_for(user)).await?;
    Ok(Json(txn))
}

// =========================================================================
// Read handlers
// =========================================================================

async fn list_balances(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
) -> Result<Json<Vec<BalanceEntity>>, AppError> {
    let entities = BalanceRepository::new(state.pool)
        .list_for_user(user.0)
        .await?;
    Ok(Json(entities))
}

async fn list_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<LedgerTransaction>>, AppError> {
    let limit = query.limit.clamp(1, 500);
    let transactions = LedgerRepository::new(state.pool)
        .list_for_user(user.0, limit)
        .await?;
    Ok(Json(transactions))
}

// =========================================================================
// Investment handlers
// =========================================================================

async fn create_investment(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Json(request): Json<CreateInvestmentRequest>,
) -> Result<(StatusCode, Json<Investment>), AppError> {
    let command = CreateInvestmentCommand {
        user_id: user.0,
        wallet_id: request.wallet_id,
        plan_id: request.plan_id,
        amount: parse_amount(&request.amount)?,
        annual_rate: request.annual_rate,
        maturity_days: request.maturity_days,
    };

    let processor = GrowthAccrualProcessor::new(state.pool, state.notifier);
    let investment = processor
        .create_investment(command, &context_for(user))
        .await?;
    Ok((StatusCode::CREATED, Json(investment)))
}

async fn get_investment(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Investment>, AppError> {
    let investment = InvestmentRepository::new(state.pool)
        .get(user.0, id)
        .await?
        .ok_or(DomainError::InvestmentNotFound(id))?;
    Ok(Json(investment))
}

async fn increase_investment(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<IncreaseInvestmentRequest>,
) -> Result<Json<Investment>, AppError> {
    let command = IncreaseInvestmentCommand {
        user_id: user.0,
        investment_id: id,
        amount: parse_amount(&request.amount)?,
    };

    let processor = GrowthAccrualProcessor::new(state.pool, state.notifier);
    let investment = processor
        .increase_investment(command, &context_for(user))
        .await?;
    Ok(Json(investment))
}

async fn withdraw_investment(
    State(state): State<AppState>,
    Extension(user): Extension<RequestUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Investment>, AppError> {
    let processor = GrowthAccrualProcessor::new(state.pool, state.notifier);
    let investment = processor
        .withdraw_investment(user.0, id, &context_for(user))
        .await?;
    Ok(Json(investment))
}

async fn trigger_growth(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GrowthOutcomeResponse>, AppError> {
    let processor = GrowthAccrualProcessor::new(state.pool, state.notifier);
    let step = processor.process_daily_growth(id, Utc::now()).await?;
    Ok(Json(GrowthOutcomeResponse::from(step)))
}

// =========================================================================
// Operational handlers
// =========================================================================

async fn run_all_growth(
    State(state): State<AppState>,
) -> Result<Json<GrowthRunReport>, AppError> {
    let processor = Arc::new(GrowthAccrualProcessor::new(
        state.pool.clone(),
        state.notifier,
    ));
    let scheduler = AccrualScheduler::new(state.pool, processor);
    let report = scheduler.run_once(Utc::now()).await;
    Ok(Json(report))
}

async fn backfill_schedules(
    State(state): State<AppState>,
) -> Result<Json<BackfillReport>, AppError> {
    let processor = GrowthAccrualProcessor::new(state.pool, state.notifier);
    let report = processor.backfill_growth_schedules().await?;
    Ok(Json(report))
}
