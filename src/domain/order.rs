//! Order records: the durable trail of a booking from reservation to
//! finalization.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EventId, OrderId, TierId, UserId};

/// Lifecycle state of an order.
///
/// `Pending` means inventory is reserved and payment is outstanding.
/// `Completed` means a trusted payment signal finalized the order. The
/// transition `Pending -> Completed` happens at most once; there is no
/// transition out of `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Inventory reserved, payment outstanding.
    Pending,
    /// Payment confirmed, registrations materialized.
    Completed,
}

impl OrderStatus {
    /// Returns the canonical storage string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }

    /// Parses a storage string back into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A buyer's order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Buyer who placed the order.
    pub user_id: UserId,
    /// Sum of `quantity * price_at_purchase` over the order's items.
    pub total_amount: Decimal,
    /// Lifecycle state.
    pub status: OrderStatus,
    /// Reference the payment gateway assigned when its order was created.
    /// `None` until the gateway call succeeds; unique once set.
    pub payment_order_ref: Option<String>,
    /// Reference of the individual payment that completed the order.
    pub payment_ref: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last mutation.
    pub updated_at: DateTime<Utc>,
}

/// One line of an order, priced at reservation time.
///
/// `price_at_purchase` snapshots the tier price so later catalog edits
/// cannot change what the buyer owes.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    /// Unique item identifier.
    pub id: uuid::Uuid,
    /// Order this item belongs to.
    pub order_id: OrderId,
    /// Tier the units were reserved from.
    pub ticket_type_id: TierId,
    /// Number of units reserved (always positive).
    pub quantity: i32,
    /// Tier unit price at reservation time.
    pub price_at_purchase: Decimal,
}

/// One attendance credential, one row per ticket unit.
#[derive(Debug, Clone, Serialize)]
pub struct EventRegistration {
    /// Unique registration identifier.
    pub id: uuid::Uuid,
    /// Order that paid for this unit.
    pub order_id: OrderId,
    /// Attendee (the order's buyer).
    pub user_id: UserId,
    /// Event being attended.
    pub event_id: EventId,
    /// Tier the unit belongs to.
    pub ticket_type_id: TierId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One requested line of a reservation: a tier and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    /// Tier to reserve from.
    pub tier_id: TierId,
    /// Units requested (always positive).
    pub quantity: i32,
}

/// Result of a successful authoritative reservation: the pending order
/// and its priced items.
#[derive(Debug, Clone)]
pub struct ReservedOrder {
    /// The order, in `Pending` state.
    pub order: Order,
    /// Priced items, one per requested line.
    pub items: Vec<OrderItem>,
}

/// Result of a successful finalization.
#[derive(Debug, Clone)]
pub struct FinalizedOrder {
    /// The order, now in `Completed` state.
    pub order: Order,
    /// The lines that were reserved, used to release soft locks.
    pub lines: Vec<ReservationLine>,
    /// Number of registration rows materialized.
    pub registrations_created: u32,
}

/// A booking as shown in the buyer's booking list.
#[derive(Debug, Clone, Serialize)]
pub struct BookingSummary {
    /// Order identifier.
    pub id: OrderId,
    /// Lifecycle state.
    pub status: OrderStatus,
    /// Order total.
    pub total_amount: Decimal,
    /// Gateway order reference, when one was created.
    pub payment_order_ref: Option<String>,
    /// When the booking was initiated.
    pub created_at: DateTime<Utc>,
    /// Per-tier lines of the booking.
    pub items: Vec<BookingItem>,
}

/// One line of a [`BookingSummary`], joined with catalog names.
#[derive(Debug, Clone, Serialize)]
pub struct BookingItem {
    /// Tier the units were reserved from.
    pub ticket_type_id: TierId,
    /// Tier display name.
    pub tier_name: String,
    /// Title of the event the tier belongs to.
    pub event_title: String,
    /// Units reserved.
    pub quantity: i32,
    /// Unit price at reservation time.
    pub price_at_purchase: Decimal,
}
