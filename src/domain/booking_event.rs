//! Domain events reflecting booking state changes.
//!
//! Every booking transition emits a [`BookingEvent`] through the
//! [`super::EventBus`]. Events are consumed by the event-log writer task
//! and persisted to the PostgreSQL event log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{OrderId, UserId};

/// Which trusted signal confirmed a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSource {
    /// Server-to-server webhook delivery from the payment gateway.
    Webhook,
    /// Client-submitted verification after checkout returned.
    ClientVerify,
}

/// Domain event emitted after every booking state change.
///
/// Monetary amounts serialize as strings (rust_decimal's default), so the
/// JSON payloads are precision-safe.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum BookingEvent {
    /// Emitted when a reservation survives the authoritative transaction
    /// and a payment order exists for it.
    BookingInitiated {
        /// Order identifier.
        order_id: OrderId,
        /// Buyer who placed the order.
        user_id: UserId,
        /// Order total.
        total_amount: Decimal,
        /// Payment gateway order reference.
        payment_order_ref: String,
        /// Initiation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a trusted payment signal finalizes the order.
    BookingConfirmed {
        /// Order identifier.
        order_id: OrderId,
        /// Buyer who placed the order.
        user_id: UserId,
        /// Reference of the payment that completed the order.
        payment_ref: String,
        /// Which trusted path confirmed it.
        source: ConfirmationSource,
        /// Number of registration rows materialized.
        registrations_created: u32,
        /// Confirmation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a reservation is rolled back after a downstream
    /// failure.
    BookingAborted {
        /// Order identifier.
        order_id: OrderId,
        /// Buyer who placed the order.
        user_id: UserId,
        /// Short description of what failed.
        reason: String,
        /// Abort timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl BookingEvent {
    /// Returns the order ID associated with this event.
    #[must_use]
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::BookingInitiated { order_id, .. }
            | Self::BookingConfirmed { order_id, .. }
            | Self::BookingAborted { order_id, .. } => *order_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::BookingInitiated { .. } => "booking_initiated",
            Self::BookingConfirmed { .. } => "booking_confirmed",
            Self::BookingAborted { .. } => "booking_aborted",
        }
    }
}
