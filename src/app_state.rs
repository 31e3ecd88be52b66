//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::idempotency::IdempotencyGate;
use crate::service::{BookingService, CatalogService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Booking lifecycle service.
    pub booking_service: Arc<BookingService>,
    /// Event and tier catalog service.
    pub catalog_service: Arc<CatalogService>,
    /// Replay gate for the initiation endpoint.
    pub idempotency: Arc<IdempotencyGate>,
    /// Public gateway API key handed to checkout clients.
    pub payment_key_id: String,
}
