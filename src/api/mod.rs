//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use std::sync::Arc;

use sqlx::PgPool;

use crate::fx::CurrencyConverter;
use crate::notify::Notifier;

pub use routes::create_router;

/// Shared state handed to every handler. Engines are constructed per
/// request from this; the converter's rate cache and the notifier are
/// the only long-lived pieces.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub converter: CurrencyConverter,
    pub notifier: Arc<dyn Notifier>,
}
