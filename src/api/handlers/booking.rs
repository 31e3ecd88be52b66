//! Booking handlers: initiation, payment verification, booking list.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use crate::api::auth::AuthenticatedUser;
use crate::api::dto::{
    BookingInitiatedResponse, BookingListResponse, BookingSummaryDto, InitiateBookingRequest,
    VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::api::idempotency::IdempotencyKey;
use crate::app_state::AppState;
use crate::cache::StoredResponse;
use crate::error::{BoxofficeError, ErrorResponse};

/// `POST /bookings`: reserve inventory and open a payment order.
///
/// Retries carrying the same `Idempotency-Key` replay the first
/// successful response instead of reserving again.
///
/// # Errors
///
/// Returns [`BoxofficeError::InsufficientAvailability`] when a line
/// cannot be covered and [`BoxofficeError::PaymentGatewayFailure`] when
/// the payment order cannot be created.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    summary = "Initiate a booking",
    description = "Reserves inventory for every requested line, creates a payment order at the gateway, and returns the pending booking together with the checkout parameters. The order stays pending until a trusted payment signal confirms it.",
    request_body = InitiateBookingRequest,
    params(
        ("x-user-id" = uuid::Uuid, Header, description = "Authenticated caller"),
        ("idempotency-key" = String, Header, description = "Caller-chosen retry key"),
    ),
    responses(
        (status = 201, description = "Booking initiated", body = BookingInitiatedResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 409, description = "Insufficient availability", body = ErrorResponse),
        (status = 502, description = "Payment gateway failure", body = ErrorResponse),
    )
)]
pub async fn initiate_booking(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    IdempotencyKey(key): IdempotencyKey,
    Json(req): Json<InitiateBookingRequest>,
) -> Result<Response, BoxofficeError> {
    if let Some(stored) = state.idempotency.lookup(user_id, &key).await {
        tracing::info!(%user_id, key, "replaying cached booking response");
        return Ok(replay(&stored));
    }

    let lines = req.lines();
    let initiated = state.booking_service.initiate_booking(user_id, &lines).await?;

    let response = BookingInitiatedResponse::from_initiated(&initiated, &state.payment_key_id);
    let body = serde_json::to_value(&response).map_err(|e| {
        BoxofficeError::Internal(format!("failed to serialize booking response: {e}"))
    })?;
    state
        .idempotency
        .record(user_id, &key, StatusCode::CREATED, &body)
        .await;

    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Rebuilds an HTTP response from a cached one.
fn replay(stored: &StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
    (status, Json(stored.body.clone())).into_response()
}

/// `POST /bookings/verify`: confirm a payment from the client redirect.
///
/// # Errors
///
/// Returns [`BoxofficeError::InvalidSignature`] when the checkout
/// signature does not verify, [`BoxofficeError::NotOrderOwner`] when the
/// order belongs to another user, and [`BoxofficeError::OrderNotFound`]
/// for an unknown payment order reference.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/verify",
    tag = "Bookings",
    summary = "Verify a payment",
    description = "Checks the checkout signature and finalizes the pending order when it verifies. Safe to retry: a booking already confirmed by the webhook reports `newly_confirmed: false`.",
    request_body = VerifyPaymentRequest,
    params(
        ("x-user-id" = uuid::Uuid, Header, description = "Authenticated caller"),
    ),
    responses(
        (status = 200, description = "Payment verified", body = VerifyPaymentResponse),
        (status = 401, description = "Signature did not verify", body = ErrorResponse),
        (status = 403, description = "Order belongs to another user", body = ErrorResponse),
        (status = 404, description = "Unknown payment order reference", body = ErrorResponse),
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, BoxofficeError> {
    let verified = state
        .booking_service
        .verify_payment(
            user_id,
            &req.payment_order_ref,
            &req.payment_ref,
            &req.signature,
        )
        .await?;
    Ok(Json(VerifyPaymentResponse::from(&verified)))
}

/// `GET /bookings`: the caller's completed bookings, newest first.
///
/// # Errors
///
/// Returns [`BoxofficeError::PersistenceError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    tag = "Bookings",
    summary = "List my bookings",
    description = "Returns the caller's completed bookings, newest first, with tier and event names joined in.",
    params(
        ("x-user-id" = uuid::Uuid, Header, description = "Authenticated caller"),
    ),
    responses(
        (status = 200, description = "Completed bookings", body = BookingListResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<impl IntoResponse, BoxofficeError> {
    let bookings = state.booking_service.list_bookings(user_id).await?;
    let data: Vec<BookingSummaryDto> = bookings.into_iter().map(BookingSummaryDto::from).collect();
    Ok(Json(BookingListResponse { data }))
}

/// Booking routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(initiate_booking).get(list_bookings))
        .route("/bookings/verify", post(verify_payment))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::api::idempotency::IdempotencyGate;
    use crate::cache::{InMemoryIdempotencyStore, InMemorySoftLockStore};
    use crate::domain::{
        EventBus, EventStatus, NewEvent, NewTicketTier, SignatureVerifier, TierId, UserId,
    };
    use crate::gateway::MockPaymentGateway;
    use crate::persistence::{BookingStore, InMemoryBookingStore};
    use crate::service::{BookingService, CatalogService};

    async fn make_state(quantity: i32) -> (AppState, Arc<InMemoryBookingStore>, TierId) {
        let store = Arc::new(InMemoryBookingStore::new());
        let locks = Arc::new(InMemorySoftLockStore::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let booking_service = Arc::new(BookingService::new(
            Arc::clone(&store) as Arc<dyn BookingStore>,
            locks,
            gateway,
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
                    quantity,
                },
            )
            .await
            .unwrap();
        (state, store, tier.id)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn replayed_initiation_does_not_reserve_twice() {
        let (state, store, tier_id) = make_state(10).await;
        let user_id = UserId::from_uuid(uuid::Uuid::new_v4());
        let request = InitiateBookingRequest {
            items: vec![crate::api::dto::BookingLineDto {
                ticket_type_id: uuid::Uuid::from(tier_id),
                quantity: 3,
            }],
        };

        let first = initiate_booking(
            State(state.clone()),
            AuthenticatedUser(user_id),
            IdempotencyKey("retry-1".to_string()),
            Json(request.clone()),
        )
        .await;
        let Ok(first) = first else {
            panic!("first initiation failed");
        };
        assert_eq!(first.status(), StatusCode::CREATED);
        let first_body = body_json(first).await;

        let second = initiate_booking(
            State(state),
            AuthenticatedUser(user_id),
            IdempotencyKey("retry-1".to_string()),
            Json(request),
        )
        .await;
        let Ok(second) = second else {
            panic!("replay failed");
        };
        assert_eq!(second.status(), StatusCode::CREATED);
        let second_body = body_json(second).await;

        assert_eq!(first_body, second_body);
        let tier = store.tier(tier_id).await.unwrap();
        assert_eq!(tier.remaining_quantity, 7);
    }

    #[tokio::test]
    async fn different_keys_reserve_independently() {
        let (state, store, tier_id) = make_state(10).await;
        let user_id = UserId::from_uuid(uuid::Uuid::new_v4());
        let request = InitiateBookingRequest {
            items: vec![crate::api::dto::BookingLineDto {
                ticket_type_id: uuid::Uuid::from(tier_id),
                quantity: 1,
            }],
        };

        for key in ["checkout-a", "checkout-b"] {
            let response = initiate_booking(
                State(state.clone()),
                AuthenticatedUser(user_id),
                IdempotencyKey(key.to_string()),
                Json(request.clone()),
            )
            .await;
            assert!(response.is_ok());
        }

        let tier = store.tier(tier_id).await.unwrap();
        assert_eq!(tier.remaining_quantity, 8);
    }

    #[tokio::test]
    async fn failed_initiation_is_not_cached() {
        let (state, store, tier_id) = make_state(2).await;
        let user_id = UserId::from_uuid(uuid::Uuid::new_v4());
        let request = InitiateBookingRequest {
            items: vec![crate::api::dto::BookingLineDto {
                ticket_type_id: uuid::Uuid::from(tier_id),
                quantity: 5,
            }],
        };

        let response = initiate_booking(
            State(state.clone()),
            AuthenticatedUser(user_id),
            IdempotencyKey("retry-1".to_string()),
            Json(request),
        )
        .await;
        assert!(matches!(
            response,
            Err(BoxofficeError::InsufficientAvailability { .. })
        ));

        // A retry under the same key with a coverable quantity succeeds.
        let retry = InitiateBookingRequest {
            items: vec![crate::api::dto::BookingLineDto {
                ticket_type_id: uuid::Uuid::from(tier_id),
                quantity: 2,
            }],
        };
        let response = initiate_booking(
            State(state),
            AuthenticatedUser(user_id),
            IdempotencyKey("retry-1".to_string()),
            Json(retry),
        )
        .await;
        assert!(response.is_ok());
        let tier = store.tier(tier_id).await.unwrap();
        assert_eq!(tier.remaining_quantity, 0);
    }
}
