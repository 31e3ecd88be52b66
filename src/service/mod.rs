//! Service layer: business logic orchestration.
//!
//! [`BookingService`] coordinates the reservation, payment, and
//! finalization flows; [`CatalogService`] covers events and tiers. Both
//! delegate durable state to the persistence layer and emit events
//! through the [`super::domain::EventBus`].

pub mod booking_service;
pub mod catalog_service;

pub use booking_service::{BookingService, InitiatedBooking, VerifiedPayment, WebhookOutcome};
pub use catalog_service::CatalogService;
