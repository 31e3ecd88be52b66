//! DTOs for the booking endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{BookingItem, BookingSummary, OrderItem, ReservationLine, TierId};
use crate::service::{InitiatedBooking, VerifiedPayment};

/// One requested line of a booking.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookingLineDto {
    /// Ticket tier to reserve from.
    pub ticket_type_id: uuid::Uuid,
    /// Units requested.
    pub quantity: i32,
}

/// Request body for `POST /bookings`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InitiateBookingRequest {
    /// Requested lines, one per tier.
    pub items: Vec<BookingLineDto>,
}

impl InitiateBookingRequest {
    /// Converts the requested lines into domain reservation lines.
    #[must_use]
    pub fn lines(&self) -> Vec<ReservationLine> {
        self.items
            .iter()
            .map(|line| ReservationLine {
                tier_id: TierId::from_uuid(line.ticket_type_id),
                quantity: line.quantity,
            })
            .collect()
    }
}

/// Payment order parameters the client opens checkout with.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentOrderDto {
    /// Gateway-assigned order reference.
    pub order_ref: String,
    /// Amount in minor currency units.
    pub amount_minor: i64,
    /// ISO currency code.
    pub currency: String,
    /// Public API key the checkout widget authenticates with.
    pub key_id: String,
}

/// One priced item of an initiated booking.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemDto {
    /// Tier the units were reserved from.
    pub ticket_type_id: uuid::Uuid,
    /// Units reserved.
    pub quantity: i32,
    /// Unit price at reservation time.
    pub price_at_purchase: Decimal,
}

impl From<&OrderItem> for OrderItemDto {
    fn from(item: &OrderItem) -> Self {
        Self {
            ticket_type_id: uuid::Uuid::from(item.ticket_type_id),
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase,
        }
    }
}

/// Response body for `POST /bookings`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingInitiatedResponse {
    /// Order identifier.
    pub booking_id: uuid::Uuid,
    /// Order lifecycle state (`"PENDING"` until a payment signal lands).
    pub status: String,
    /// Order total in major currency units.
    pub total_amount: Decimal,
    /// Priced items of the order.
    pub items: Vec<OrderItemDto>,
    /// Payment order for the checkout client.
    pub payment: PaymentOrderDto,
}

impl BookingInitiatedResponse {
    /// Builds the response from a successful initiation.
    #[must_use]
    pub fn from_initiated(initiated: &InitiatedBooking, key_id: &str) -> Self {
        Self {
            booking_id: uuid::Uuid::from(initiated.order.id),
            status: initiated.order.status.as_str().to_string(),
            total_amount: initiated.order.total_amount,
            items: initiated.items.iter().map(OrderItemDto::from).collect(),
            payment: PaymentOrderDto {
                order_ref: initiated.payment.reference.clone(),
                amount_minor: initiated.payment.amount_minor,
                currency: initiated.payment.currency.clone(),
                key_id: key_id.to_string(),
            },
        }
    }
}

/// Request body for `POST /bookings/verify`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    /// Gateway order reference returned at initiation.
    pub payment_order_ref: String,
    /// Gateway payment reference produced by checkout.
    pub payment_ref: String,
    /// Hex HMAC signature over `"{payment_order_ref}|{payment_ref}"`.
    pub signature: String,
}

/// Response body for `POST /bookings/verify`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    /// Order identifier.
    pub booking_id: uuid::Uuid,
    /// Order lifecycle state after verification.
    pub status: String,
    /// `false` when another trusted signal had already finalized the
    /// order and this call changed nothing.
    pub newly_confirmed: bool,
}

impl From<&VerifiedPayment> for VerifyPaymentResponse {
    fn from(verified: &VerifiedPayment) -> Self {
        Self {
            booking_id: uuid::Uuid::from(verified.order.id),
            status: verified.order.status.as_str().to_string(),
            newly_confirmed: verified.newly_confirmed,
        }
    }
}

/// One line of a booking in the buyer's list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingItemDto {
    /// Tier the units were reserved from.
    pub ticket_type_id: uuid::Uuid,
    /// Tier display name.
    pub tier_name: String,
    /// Title of the event the tier belongs to.
    pub event_title: String,
    /// Units reserved.
    pub quantity: i32,
    /// Unit price at reservation time.
    pub price_at_purchase: Decimal,
}

impl From<BookingItem> for BookingItemDto {
    fn from(item: BookingItem) -> Self {
        Self {
            ticket_type_id: uuid::Uuid::from(item.ticket_type_id),
            tier_name: item.tier_name,
            event_title: item.event_title,
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase,
        }
    }
}

/// One completed booking in the buyer's list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingSummaryDto {
    /// Order identifier.
    pub booking_id: uuid::Uuid,
    /// Order lifecycle state.
    pub status: String,
    /// Order total.
    pub total_amount: Decimal,
    /// Gateway order reference, when one was created.
    pub payment_order_ref: Option<String>,
    /// When the booking was initiated.
    pub created_at: DateTime<Utc>,
    /// Per-tier lines of the booking.
    pub items: Vec<BookingItemDto>,
}

impl From<BookingSummary> for BookingSummaryDto {
    fn from(summary: BookingSummary) -> Self {
        Self {
            booking_id: uuid::Uuid::from(summary.id),
            status: summary.status.as_str().to_string(),
            total_amount: summary.total_amount,
            payment_order_ref: summary.payment_order_ref,
            created_at: summary.created_at,
            items: summary.items.into_iter().map(BookingItemDto::from).collect(),
        }
    }
}

/// Response body for `GET /bookings`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingListResponse {
    /// Completed bookings, newest first.
    pub data: Vec<BookingSummaryDto>,
}
