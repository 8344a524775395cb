//! Transfer engine module
//!
//! Orchestrates withdraw / deposit / swap money movements.

mod commands;
mod transfer;

pub use commands::{Counterparty, DepositCommand, SwapCommand, WithdrawCommand};
pub use transfer::TransferEngine;
