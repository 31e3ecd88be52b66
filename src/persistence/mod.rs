//! Persistence layer: the authoritative booking store.
//!
//! [`BookingStore`] is the seam between the coordination logic and durable
//! storage. The operations that must be atomic (reserving inventory,
//! finalizing an order, compensating a failed reservation) are exposed as
//! single calls so each implementation owns its transaction boundaries.
//! The concrete implementation uses `sqlx::PgPool`; an in-memory
//! implementation backs tests and local development.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{
    BookingSummary, Event, EventId, EventStatus, FinalizedOrder, NewEvent, NewTicketTier, Order,
    OrderId, ReservationLine, ReservedOrder, TicketTier, TierId, UserId,
};
use crate::error::BoxofficeError;

pub use memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;

/// Durable store behind the reservation and finalization flows.
#[async_trait]
pub trait BookingStore: Send + Sync + std::fmt::Debug {
    /// Creates an event with the given derived slug.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidRequest`] when the slug is already
    /// taken, or [`BoxofficeError::PersistenceError`] on storage failure.
    async fn create_event(&self, new: &NewEvent, slug: &str) -> Result<Event, BoxofficeError>;

    /// Looks up an event by its slug.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::EventNotFound`] when no event has the
    /// slug.
    async fn event_by_slug(&self, slug: &str) -> Result<Event, BoxofficeError>;

    /// Lists events, optionally filtered by status, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PersistenceError`] on storage failure.
    async fn list_events(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, BoxofficeError>;

    /// Creates a ticket tier under an event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::EventNotFound`] when the event does not
    /// exist.
    async fn create_tier(
        &self,
        event_id: EventId,
        new: &NewTicketTier,
    ) -> Result<TicketTier, BoxofficeError>;

    /// Lists the tiers of an event, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::EventNotFound`] when the event does not
    /// exist.
    async fn tiers_for_event(&self, event_id: EventId) -> Result<Vec<TicketTier>, BoxofficeError>;

    /// Looks up a single tier.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::TierNotFound`] when the tier does not
    /// exist.
    async fn tier(&self, tier_id: TierId) -> Result<TicketTier, BoxofficeError>;

    /// Atomically reserves inventory for every line and creates the
    /// pending order with its priced items.
    ///
    /// All-or-nothing: if any line cannot be covered, no inventory moves
    /// and no order is created. Tier rows are locked in `TierId` order so
    /// concurrent multi-tier reservations cannot deadlock.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::TierNotFound`] for an unknown tier,
    /// [`BoxofficeError::InsufficientAvailability`] when the authoritative
    /// count cannot cover a line, or
    /// [`BoxofficeError::PersistenceError`] on storage failure.
    async fn reserve(
        &self,
        user_id: UserId,
        lines: &[ReservationLine],
    ) -> Result<ReservedOrder, BoxofficeError>;

    /// Records the payment gateway's order reference on a pending order.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::OrderNotFound`] when the order does not
    /// exist.
    async fn attach_payment_order(
        &self,
        order_id: OrderId,
        payment_order_ref: &str,
    ) -> Result<(), BoxofficeError>;

    /// Compensates a failed reservation: restores every reserved unit and
    /// deletes the pending order with its items, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PersistenceError`] on storage failure.
    /// Unknown or already-deleted orders are a no-op.
    async fn abort_pending_order(&self, order_id: OrderId) -> Result<(), BoxofficeError>;

    /// Finalizes the pending order carrying this payment order reference.
    ///
    /// The `PENDING -> COMPLETED` transition is a single conditional
    /// update, so exactly one caller wins when the webhook and the client
    /// verify path race. Registration rows (one per ticket unit) are
    /// materialized in the same transaction. Returns `Ok(None)` when no
    /// pending order matches, which callers treat as an idempotent no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PersistenceError`] on storage failure.
    async fn finalize_order(
        &self,
        payment_order_ref: &str,
        payment_ref: &str,
    ) -> Result<Option<FinalizedOrder>, BoxofficeError>;

    /// Looks up an order by its payment gateway order reference,
    /// regardless of status.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PersistenceError`] on storage failure.
    async fn order_by_payment_order_ref(
        &self,
        payment_order_ref: &str,
    ) -> Result<Option<Order>, BoxofficeError>;

    /// Returns the buyer's completed bookings, newest first, joined with
    /// tier and event names.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PersistenceError`] on storage failure.
    async fn completed_bookings(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BookingSummary>, BoxofficeError>;

    /// Appends a booking event to the event log.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PersistenceError`] on storage failure.
    async fn append_event(
        &self,
        order_id: OrderId,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, BoxofficeError>;
}
