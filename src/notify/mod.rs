//! Notifications
//!
//! Best-effort, fire-and-forget delivery after successful ledger
//! operations. A failed notification never rolls back the operation
//! that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{CurrencyCode, TransactionKind};

/// Errors from the notification collaborator
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Event payloads handed to the notification collaborator
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    TransferCompleted {
        user_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        currency: CurrencyCode,
        reference: String,
    },
    InvestmentOpened {
        user_id: Uuid,
        investment_id: Uuid,
        amount: Decimal,
    },
    GrowthApplied {
        user_id: Uuid,
        investment_id: Uuid,
        growth: Decimal,
        matured: bool,
    },
    InvestmentWithdrawn {
        user_id: Uuid,
        investment_id: Uuid,
        amount: Decimal,
    },
}

/// Notification delivery seam. The real delivery service lives outside
/// this crate; the default implementation just logs.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError>;
}

/// Default notifier: structured log lines only.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<(), NotifyError> {
        tracing::info!(?event, "notification");
        Ok(())
    }
}

/// Deliver an event in the background. Failures are logged and dropped.
pub fn dispatch(notifier: Arc<dyn Notifier>, event: NotificationEvent) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(event).await {
            tracing::warn!(error = %e, "notification delivery failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNotifier {
        delivered: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _event: NotificationEvent) -> Result<(), NotifyError> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let notifier = Arc::new(CountingNotifier {
            delivered: delivered.clone(),
        });

        dispatch(
            notifier,
            NotificationEvent::InvestmentOpened {
                user_id: Uuid::new_v4(),
                investment_id: Uuid::new_v4(),
                amount: Decimal::new(100, 0),
            },
        );

        // Spawned task; yield until it runs
        tokio::task::yield_now().await;
        for _ in 0..50 {
            if delivered.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }
}
