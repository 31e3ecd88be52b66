//! Booking service: coordinates reservation, payment, and finalization.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::cache::SoftLockStore;
use crate::domain::{
    BookingEvent, BookingSummary, ConfirmationSource, EventBus, FinalizedOrder, Order, OrderItem,
    ReservationLine, ReservedOrder, SignatureVerifier, UserId,
};
use crate::error::BoxofficeError;
use crate::gateway::{PaymentGateway, PaymentOrder};
use crate::persistence::BookingStore;

/// Everything the checkout client needs after a successful initiation.
#[derive(Debug, Clone)]
pub struct InitiatedBooking {
    /// The pending order, with its payment order reference attached.
    pub order: Order,
    /// Priced items of the order, one per requested line.
    pub items: Vec<OrderItem>,
    /// Payment order the client opens checkout against.
    pub payment: PaymentOrder,
}

/// Outcome of a processed webhook delivery.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    /// The delivery finalized a pending order.
    Confirmed(FinalizedOrder),
    /// No pending order matched the delivery's order reference. The
    /// delivery is acknowledged so the gateway stops retrying.
    Ignored,
}

/// Outcome of a client-side payment verification.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    /// The completed order.
    pub order: Order,
    /// `false` when another confirmation had already finalized the order
    /// and this call changed nothing.
    pub newly_confirmed: bool,
}

/// Orchestration layer for the booking lifecycle.
///
/// Stateless coordinator: owns references to the [`BookingStore`] for
/// authoritative state, the [`SoftLockStore`] for expiring reservation
/// counters, the [`PaymentGateway`] for order creation, and the
/// [`EventBus`] for event emission. Every mutation method follows the
/// pattern: pre-check → lock → reserve → call the gateway → emit events →
/// return result, compensating on failure.
#[derive(Debug, Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    locks: Arc<dyn SoftLockStore>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: SignatureVerifier,
    event_bus: EventBus,
}

impl BookingService {
    /// Creates a new `BookingService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn BookingStore>,
        locks: Arc<dyn SoftLockStore>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: SignatureVerifier,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            locks,
            gateway,
            verifier,
            event_bus,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Initiates a booking: reserves inventory for every line, creates the
    /// payment order, and leaves the order pending until a trusted payment
    /// signal finalizes it.
    ///
    /// The availability pre-check reads effective availability (the
    /// authoritative count minus units soft-locked by other in-flight
    /// reservations), so two buyers cannot both be sent to checkout for
    /// the same last ticket. The reservation transaction re-checks the
    /// authoritative count regardless; the soft locks only narrow the
    /// window.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidRequest`] for an empty or
    /// non-positive line set, [`BoxofficeError::TierNotFound`] for an
    /// unknown tier, [`BoxofficeError::InsufficientAvailability`] when a
    /// line cannot be covered, [`BoxofficeError::SoftLockUnavailable`]
    /// when the lock store is unreachable, and
    /// [`BoxofficeError::PaymentGatewayFailure`] when the payment order
    /// cannot be created (the reservation is rolled back first).
    pub async fn initiate_booking(
        &self,
        user_id: UserId,
        lines: &[ReservationLine],
    ) -> Result<InitiatedBooking, BoxofficeError> {
        validate_lines(lines)?;
        self.check_availability(lines).await?;
        self.acquire_locks(lines).await?;

        let reserved = match self.store.reserve(user_id, lines).await {
            Ok(reserved) => reserved,
            Err(error) => {
                self.release_locks(lines).await;
                return Err(error);
            }
        };
        let ReservedOrder { mut order, items } = reserved;

        let payment = match self
            .gateway
            .create_order(order.id, user_id, order.total_amount)
            .await
        {
            Ok(payment) => payment,
            Err(error) => {
                self.abort_reservation(&order, lines, "payment order creation failed")
                    .await;
                return Err(error);
            }
        };

        if let Err(error) = self
            .store
            .attach_payment_order(order.id, &payment.reference)
            .await
        {
            self.abort_reservation(&order, lines, "payment order reference not recorded")
                .await;
            return Err(error);
        }
        order.payment_order_ref = Some(payment.reference.clone());
        order.updated_at = Utc::now();

        let _ = self.event_bus.publish(BookingEvent::BookingInitiated {
            order_id: order.id,
            user_id,
            total_amount: order.total_amount,
            payment_order_ref: payment.reference.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            amount = %order.total_amount,
            "booking initiated"
        );

        Ok(InitiatedBooking {
            order,
            items,
            payment,
        })
    }

    /// Processes a webhook delivery from the payment gateway.
    ///
    /// The signature is checked over the raw body bytes before anything is
    /// parsed. A delivery whose order reference matches no pending order
    /// returns [`WebhookOutcome::Ignored`]; gateway retries and deliveries
    /// that lost the race against client verification land here.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidSignature`] when the signature
    /// does not verify, [`BoxofficeError::InvalidRequest`] when the
    /// payload is malformed or carries no order reference, and
    /// [`BoxofficeError::PersistenceError`] on storage failure.
    pub async fn confirm_from_webhook(
        &self,
        raw_body: &[u8],
        signature_hex: &str,
    ) -> Result<WebhookOutcome, BoxofficeError> {
        self.verifier.verify_webhook(raw_body, signature_hex)?;

        let delivery: WebhookDelivery = serde_json::from_slice(raw_body).map_err(|_| {
            BoxofficeError::InvalidRequest("malformed webhook payload".to_string())
        })?;
        let entity = delivery.payload.payment.entity;
        let Some(order_ref) = entity.order_id else {
            return Err(BoxofficeError::InvalidRequest(
                "webhook payload carries no order reference".to_string(),
            ));
        };

        match self
            .finalize(&order_ref, &entity.id, ConfirmationSource::Webhook)
            .await?
        {
            Some(finalized) => Ok(WebhookOutcome::Confirmed(finalized)),
            None => {
                tracing::info!(
                    payment_order_ref = %order_ref,
                    "webhook matched no pending order; acknowledged"
                );
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    /// Verifies a client-relayed payment signature and finalizes the
    /// order it references.
    ///
    /// Unlike the webhook path this one is caller-initiated, so the order
    /// must belong to the authenticated buyer. When the webhook already
    /// finalized the order the call reports success with
    /// `newly_confirmed: false` instead of failing, so client retries and
    /// races resolve cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidSignature`] when the signature
    /// does not verify, [`BoxofficeError::OrderNotFound`] when no order
    /// carries the reference, [`BoxofficeError::NotOrderOwner`] when the
    /// order belongs to someone else, and
    /// [`BoxofficeError::PersistenceError`] on storage failure.
    pub async fn verify_payment(
        &self,
        user_id: UserId,
        payment_order_ref: &str,
        payment_ref: &str,
        signature_hex: &str,
    ) -> Result<VerifiedPayment, BoxofficeError> {
        self.verifier
            .verify_client(payment_order_ref, payment_ref, signature_hex)?;

        let order = self
            .store
            .order_by_payment_order_ref(payment_order_ref)
            .await?
            .ok_or_else(|| BoxofficeError::OrderNotFound(payment_order_ref.to_string()))?;
        if order.user_id != user_id {
            return Err(BoxofficeError::NotOrderOwner);
        }

        if let Some(finalized) = self
            .finalize(payment_order_ref, payment_ref, ConfirmationSource::ClientVerify)
            .await?
        {
            return Ok(VerifiedPayment {
                order: finalized.order,
                newly_confirmed: true,
            });
        }

        // Lost the race with another confirmation; re-read the final row.
        let order = self
            .store
            .order_by_payment_order_ref(payment_order_ref)
            .await?
            .ok_or_else(|| BoxofficeError::OrderNotFound(payment_order_ref.to_string()))?;
        Ok(VerifiedPayment {
            order,
            newly_confirmed: false,
        })
    }

    /// Returns the buyer's completed bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PersistenceError`] on storage failure.
    pub async fn list_bookings(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BookingSummary>, BoxofficeError> {
        self.store.completed_bookings(user_id).await
    }

    /// Single finalization funnel for both trusted paths.
    ///
    /// The store's conditional update guarantees at most one caller gets
    /// `Some` per order; soft locks are only released on that path.
    async fn finalize(
        &self,
        payment_order_ref: &str,
        payment_ref: &str,
        source: ConfirmationSource,
    ) -> Result<Option<FinalizedOrder>, BoxofficeError> {
        let Some(finalized) = self
            .store
            .finalize_order(payment_order_ref, payment_ref)
            .await?
        else {
            return Ok(None);
        };

        self.release_locks(&finalized.lines).await;

        let _ = self.event_bus.publish(BookingEvent::BookingConfirmed {
            order_id: finalized.order.id,
            user_id: finalized.order.user_id,
            payment_ref: payment_ref.to_string(),
            source,
            registrations_created: finalized.registrations_created,
            timestamp: Utc::now(),
        });
        tracing::info!(
            order_id = %finalized.order.id,
            registrations = finalized.registrations_created,
            ?source,
            "booking confirmed"
        );
        Ok(Some(finalized))
    }

    async fn check_availability(&self, lines: &[ReservationLine]) -> Result<(), BoxofficeError> {
        for line in lines {
            let tier = self.store.tier(line.tier_id).await?;
            let locked = self.locks.locked_count(line.tier_id).await?;
            let available = i64::from(tier.remaining_quantity) - locked;
            if available < i64::from(line.quantity) {
                return Err(BoxofficeError::InsufficientAvailability {
                    tier_name: tier.name,
                    available: i32::try_from(available.max(0)).unwrap_or(i32::MAX),
                });
            }
        }
        Ok(())
    }

    async fn acquire_locks(&self, lines: &[ReservationLine]) -> Result<(), BoxofficeError> {
        let mut acquired: Vec<ReservationLine> = Vec::with_capacity(lines.len());
        for line in lines {
            if let Err(error) = self
                .locks
                .acquire(line.tier_id, i64::from(line.quantity))
                .await
            {
                self.release_locks(&acquired).await;
                return Err(error);
            }
            acquired.push(*line);
        }
        Ok(())
    }

    /// Best-effort: a failed release only logs, because the counter's TTL
    /// expires the units anyway.
    async fn release_locks(&self, lines: &[ReservationLine]) {
        for line in lines {
            if let Err(error) = self
                .locks
                .release(line.tier_id, i64::from(line.quantity))
                .await
            {
                tracing::warn!(tier_id = %line.tier_id, %error, "soft lock release failed");
            }
        }
    }

    /// Compensates a reservation whose downstream step failed: restocks
    /// inventory, drops the pending order, releases the soft locks, and
    /// emits [`BookingEvent::BookingAborted`].
    async fn abort_reservation(&self, order: &Order, lines: &[ReservationLine], reason: &str) {
        if let Err(error) = self.store.abort_pending_order(order.id).await {
            tracing::error!(
                order_id = %order.id,
                %error,
                "reservation rollback failed; order left pending"
            );
        }
        self.release_locks(lines).await;
        let _ = self.event_bus.publish(BookingEvent::BookingAborted {
            order_id: order.id,
            user_id: order.user_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        tracing::warn!(order_id = %order.id, reason, "booking aborted");
    }
}

fn validate_lines(lines: &[ReservationLine]) -> Result<(), BoxofficeError> {
    if lines.is_empty() {
        return Err(BoxofficeError::InvalidRequest(
            "a booking needs at least one line".to_string(),
        ));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(BoxofficeError::InvalidRequest(format!(
                "quantity for tier {} must be positive",
                line.tier_id
            )));
        }
    }
    Ok(())
}

/// Subset of the gateway's webhook delivery the service reads. Unknown
/// fields are ignored.
#[derive(Debug, Deserialize)]
struct WebhookDelivery {
    payload: WebhookEnvelope,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    payment: WebhookPayment,
}

#[derive(Debug, Deserialize)]
struct WebhookPayment {
    entity: WebhookPaymentEntity,
}

#[derive(Debug, Deserialize)]
struct WebhookPaymentEntity {
    id: String,
    order_id: Option<String>,
}
