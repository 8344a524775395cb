//! Investment growth module
//!
//! Schedule generation at inception, daily accrual application, and the
//! time-driven batch driver.

pub mod processor;
pub mod schedule;
pub mod scheduler;

pub use processor::{
    BackfillReport, CreateInvestmentCommand, GrowthAccrualProcessor, IncreaseInvestmentCommand,
};
pub use schedule::{generate, generate_with, DEFAULT_VOLATILITY};
pub use scheduler::{AccrualScheduler, AccrualSchedulerConfig, GrowthRunReport, RunDetail};
