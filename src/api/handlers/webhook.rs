//! Payment gateway webhook handler.
//!
//! The webhook is one of the two trusted confirmation paths. Signature
//! verification runs over the raw request bytes, so the handler takes
//! [`Bytes`] rather than `Json`: re-serializing a parsed body would
//! break the HMAC.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::{BoxofficeError, ErrorResponse};
use crate::service::WebhookOutcome;

/// Header carrying the gateway's HMAC signature of the request body.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Acknowledgement body returned to the gateway.
#[derive(Debug, Serialize, ToSchema)]
struct WebhookAck {
    /// `"processed"` when a pending order was finalized, `"acknowledged"`
    /// when the delivery matched nothing actionable.
    status: &'static str,
}

/// `POST /webhooks/payment`: confirm a booking from a gateway delivery.
///
/// Verified deliveries always get a 200, even when no pending order
/// matches: the gateway retries anything else, and a delivery for an
/// already-completed or unknown order will never become actionable.
///
/// # Errors
///
/// Returns [`BoxofficeError::InvalidSignature`] when the signature
/// header is missing or does not verify, and
/// [`BoxofficeError::InvalidRequest`] for an unparseable payload.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payment",
    tag = "Webhooks",
    summary = "Payment gateway webhook",
    description = "Ingests a payment event from the gateway. The raw body is authenticated with an HMAC signature carried in the `x-webhook-signature` header before anything is parsed.",
    params(
        ("x-webhook-signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body"),
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Delivery processed or acknowledged", body = WebhookAck),
        (status = 400, description = "Unparseable payload", body = ErrorResponse),
        (status = 401, description = "Signature did not verify", body = ErrorResponse),
    )
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BoxofficeError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(BoxofficeError::InvalidSignature)?;

    let outcome = state
        .booking_service
        .confirm_from_webhook(&body, signature)
        .await?;
    let ack = match outcome {
        WebhookOutcome::Confirmed(_) => WebhookAck {
            status: "processed",
        },
        WebhookOutcome::Ignored => WebhookAck {
            status: "acknowledged",
        },
    };
    Ok(Json(ack))
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/payment", post(payment_webhook))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use hmac::{Hmac, Mac};
    use rust_decimal::Decimal;
    use sha2::Sha256;

    use super::*;
    use crate::api::idempotency::IdempotencyGate;
    use crate::cache::{InMemoryIdempotencyStore, InMemorySoftLockStore};
    use crate::domain::{
        EventBus, EventStatus, NewEvent, NewTicketTier, ReservationLine, SignatureVerifier, UserId,
    };
    use crate::gateway::MockPaymentGateway;
    use crate::persistence::{BookingStore, InMemoryBookingStore};
    use crate::service::{BookingService, CatalogService};

    async fn make_state() -> (AppState, Arc<InMemoryBookingStore>) {
        let store = Arc::new(InMemoryBookingStore::new());
        let booking_service = Arc::new(BookingService::new(
            Arc::clone(&store) as Arc<dyn BookingStore>,
            Arc::new(InMemorySoftLockStore::new()),
            Arc::new(MockPaymentGateway::new()),
            SignatureVerifier::new("api_secret", "webhook_secret"),
            EventBus::new(100),
        ));
        let catalog_service = Arc::new(CatalogService::new(
            Arc::clone(&store) as Arc<dyn BookingStore>,
        ));
        let idempotency = Arc::new(IdempotencyGate::new(Arc::new(
            InMemoryIdempotencyStore::new(),
        )));
        let state = AppState {
            booking_service,
            catalog_service,
            idempotency,
            payment_key_id: "key_test".to_string(),
        };
        (state, store)
    }

    async fn initiate(state: &AppState, store: &InMemoryBookingStore) -> String {
        let event = store
            .create_event(
                &NewEvent {
                    title: "Summer Music Festival".to_string(),
                    description: None,
                    venue: None,
                    status: EventStatus::Published,
                    primary_image: None,
                    starts_at: Utc::now() + chrono::Duration::days(30),
                    ends_at: None,
                },
                "summer-music-festival",
            )
            .await
            .unwrap();
        let tier = store
            .create_tier(
                event.id,
                &NewTicketTier {
                    name: "General Admission".to_string(),
                    price: Decimal::new(5_000, 2),
                    quantity: 5,
                },
            )
            .await
            .unwrap();
        let initiated = state
            .booking_service
            .initiate_booking(
                UserId::from_uuid(uuid::Uuid::new_v4()),
                &[ReservationLine {
                    tier_id: tier.id,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        initiated.payment.reference
    }

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(b"webhook_secret").unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn delivery(order_ref: &str) -> String {
        serde_json::json!({
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": { "id": "pay_001", "order_id": order_ref }
                }
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let (state, _store) = make_state().await;
        let outcome = payment_webhook(
            State(state),
            HeaderMap::new(),
            Bytes::from_static(b"{}"),
        )
        .await;
        assert!(matches!(outcome, Err(BoxofficeError::InvalidSignature)));
    }

    #[tokio::test]
    async fn delivery_statuses_reflect_finalization() {
        let (state, store) = make_state().await;
        let order_ref = initiate(&state, &store).await;
        let body = delivery(&order_ref);
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, sign(body.as_bytes()).parse().unwrap());

        // First delivery finalizes the pending order.
        let first = payment_webhook(
            State(state.clone()),
            headers.clone(),
            Bytes::from(body.clone()),
        )
        .await;
        let Ok(first) = first else {
            panic!("first delivery failed");
        };
        let bytes =
            axum::body::to_bytes(first.into_response().into_body(), usize::MAX)
                .await
                .unwrap();
        let ack: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ack["status"], "processed");

        // A redelivery matches no pending order and is acknowledged.
        let second = payment_webhook(State(state), headers, Bytes::from(body)).await;
        let Ok(second) = second else {
            panic!("redelivery failed");
        };
        let bytes =
            axum::body::to_bytes(second.into_response().into_body(), usize::MAX)
                .await
                .unwrap();
        let ack: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ack["status"], "acknowledged");
    }
}
