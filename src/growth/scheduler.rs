//! Accrual Scheduler
//!
//! Time-driven daily driver over all active investments. One failing
//! investment is caught, logged and counted; it never aborts the batch.
//! A single in-process driver is assumed; the daily cadence completes
//! well before the next trigger.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::time::interval;
use uuid::Uuid;

use crate::domain::AccrualStep;
use crate::store::InvestmentRepository;

use super::processor::GrowthAccrualProcessor;

/// Configuration for the accrual scheduler
#[derive(Debug, Clone)]
pub struct AccrualSchedulerConfig {
    /// Interval between runs (default: 24 hours)
    pub run_interval: Duration,
}

impl Default for AccrualSchedulerConfig {
    fn default() -> Self {
        Self {
            run_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Per-investment outcome in a run report
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunDetail {
    pub investment_id: Uuid,
    pub outcome: String,
}

/// Aggregated result of one daily run
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GrowthRunReport {
    pub processed: u32,
    pub skipped: u32,
    pub matured: u32,
    pub failed: u32,
    pub details: Vec<RunDetail>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Daily driver invoking the processor on every active investment
pub struct AccrualScheduler {
    investments: InvestmentRepository,
    processor: Arc<GrowthAccrualProcessor>,
    config: AccrualSchedulerConfig,
}

impl AccrualScheduler {
    pub fn new(pool: PgPool, processor: Arc<GrowthAccrualProcessor>) -> Self {
        Self {
            investments: InvestmentRepository::new(pool),
            processor,
            config: AccrualSchedulerConfig::default(),
        }
    }

    pub fn with_config(
        pool: PgPool,
        processor: Arc<GrowthAccrualProcessor>,
        config: AccrualSchedulerConfig,
    ) -> Self {
        Self {
            investments: InvestmentRepository::new(pool),
            processor,
            config,
        }
    }

    /// Start the scheduler in the background.
    /// Returns a handle that can be used to abort it.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.run_interval.as_secs(),
            "accrual scheduler started"
        );

        let mut ticker = interval(self.config.run_interval);
        // The first tick fires immediately; catch up on start
        loop {
            ticker.tick().await;
            let report = self.run_once(Utc::now()).await;
            tracing::info!(
                processed = report.processed,
                skipped = report.skipped,
                matured = report.matured,
                failed = report.failed,
                "daily growth run completed"
            );
        }
    }

    /// Process all active, unmatured investments once. Also serves the
    /// manual run-all trigger.
    pub async fn run_once(&self, as_of: DateTime<Utc>) -> GrowthRunReport {
        let mut report = GrowthRunReport::default();

        let ids = match self.investments.active_due_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "could not list active investments");
                report.completed_at = Some(Utc::now());
                return report;
            }
        };

        for id in ids {
            match self.processor.process_daily_growth(id, as_of).await {
                Ok(AccrualStep::Applied(application)) => {
                    report.processed += 1;
                    if application.matured {
                        report.matured += 1;
                    }
                    report.details.push(RunDetail {
                        investment_id: id,
                        outcome: format!("applied {}", application.growth),
                    });
                }
                Ok(AccrualStep::Skipped(reason)) => {
                    report.skipped += 1;
                    report.details.push(RunDetail {
                        investment_id: id,
                        outcome: reason.as_str().to_string(),
                    });
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(investment_id = %id, error = %e, "daily growth failed");
                    report.details.push(RunDetail {
                        investment_id: id,
                        outcome: format!("failed: {}", e),
                    });
                }
            }
        }

        report.completed_at = Some(Utc::now());
        report
    }
}
