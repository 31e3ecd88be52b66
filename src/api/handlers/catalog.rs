//! Catalog handlers: events and their ticket tiers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::auth::AuthenticatedUser;
use crate::api::dto::{
    CreateEventRequest, CreateTierRequest, EventDetailResponse, EventDto, EventListQuery,
    EventListResponse, PaginationMeta, PaginationParams, TierDto,
};
use crate::app_state::AppState;
use crate::domain::EventStatus;
use crate::error::{BoxofficeError, ErrorResponse};

/// `POST /events`: create an event.
///
/// # Errors
///
/// Returns [`BoxofficeError::InvalidRequest`] for an unknown status
/// string, a title that yields an empty slug, or a slug collision.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Catalog",
    summary = "Create an event",
    description = "Creates a catalog event. The URL slug is derived from the title and must be unique.",
    request_body = CreateEventRequest,
    params(
        ("x-user-id" = uuid::Uuid, Header, description = "Authenticated organizer"),
    ),
    responses(
        (status = 201, description = "Event created", body = EventDto),
        (status = 400, description = "Invalid request or slug collision", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, BoxofficeError> {
    let new = req.into_new_event()?;
    let event = state.catalog_service.create_event(&new).await?;
    Ok((StatusCode::CREATED, Json(EventDto::from(event))))
}

/// `GET /events`: list events with pagination.
///
/// Without a `status` filter only published events are returned, which
/// is what public listings want.
///
/// # Errors
///
/// Returns [`BoxofficeError::InvalidRequest`] for an unknown status
/// filter.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Catalog",
    summary = "List events",
    description = "Returns a paginated list of events ordered by start time. Defaults to published events only.",
    params(
        ("page" = Option<u32>, Query, description = "Page number (1-indexed)"),
        ("per_page" = Option<u32>, Query, description = "Items per page (max 100)"),
        ("status" = Option<String>, Query, description = "Status filter: DRAFT or PUBLISHED"),
    ),
    responses(
        (status = 200, description = "Paginated event list", body = EventListResponse),
        (status = 400, description = "Unknown status filter", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<EventListQuery>,
) -> Result<impl IntoResponse, BoxofficeError> {
    let params = params.clamped();
    let status = match filter.status.as_deref() {
        None => Some(EventStatus::Published),
        Some(s) => Some(EventStatus::parse(s).ok_or_else(|| {
            BoxofficeError::InvalidRequest(format!("unknown event status '{s}'"))
        })?),
    };

    let events = state.catalog_service.list_events(status).await?;

    let total = events.len() as u32;
    let per_page = params.per_page;
    let page = params.page;
    let total_pages = if total == 0 {
        0
    } else {
        total.div_ceil(per_page)
    };

    let start = ((page - 1) * per_page) as usize;
    let data: Vec<EventDto> = events
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .map(EventDto::from)
        .collect();

    Ok(Json(EventListResponse {
        data,
        pagination: PaginationMeta {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

/// `GET /events/{slug}`: event details with its ticket tiers.
///
/// # Errors
///
/// Returns [`BoxofficeError::EventNotFound`] when no event has the slug.
#[utoipa::path(
    get,
    path = "/api/v1/events/{slug}",
    tag = "Catalog",
    summary = "Get event details",
    description = "Returns a single event by slug together with its ticket tiers, cheapest first.",
    params(
        ("slug" = String, Path, description = "Event slug"),
    ),
    responses(
        (status = 200, description = "Event details", body = EventDetailResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, BoxofficeError> {
    let (event, tiers) = state.catalog_service.event_with_tiers(&slug).await?;
    Ok(Json(EventDetailResponse {
        event: EventDto::from(event),
        ticket_types: tiers.into_iter().map(TierDto::from).collect(),
    }))
}

/// `POST /events/{slug}/ticket-types`: create a ticket tier.
///
/// # Errors
///
/// Returns [`BoxofficeError::EventNotFound`] when no event has the slug
/// and [`BoxofficeError::InvalidRequest`] for a blank name, negative
/// price, or negative quantity.
#[utoipa::path(
    post,
    path = "/api/v1/events/{slug}/ticket-types",
    tag = "Catalog",
    summary = "Create a ticket tier",
    description = "Creates a sellable ticket tier under the event with the given slug.",
    request_body = CreateTierRequest,
    params(
        ("slug" = String, Path, description = "Event slug"),
        ("x-user-id" = uuid::Uuid, Header, description = "Authenticated organizer"),
    ),
    responses(
        (status = 201, description = "Tier created", body = TierDto),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn create_tier(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(slug): Path<String>,
    Json(req): Json<CreateTierRequest>,
) -> Result<impl IntoResponse, BoxofficeError> {
    let event = state.catalog_service.event_by_slug(&slug).await?;
    let tier = state
        .catalog_service
        .create_tier(event.id, &req.into_new_tier())
        .await?;
    Ok((StatusCode::CREATED, Json(TierDto::from(tier))))
}

/// `GET /events/{slug}/ticket-types`: list an event's ticket tiers.
///
/// # Errors
///
/// Returns [`BoxofficeError::EventNotFound`] when no event has the slug.
#[utoipa::path(
    get,
    path = "/api/v1/events/{slug}/ticket-types",
    tag = "Catalog",
    summary = "List ticket tiers",
    description = "Returns the event's ticket tiers, cheapest first.",
    params(
        ("slug" = String, Path, description = "Event slug"),
    ),
    responses(
        (status = 200, description = "Ticket tiers", body = Vec<TierDto>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_tiers(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, BoxofficeError> {
    let event = state.catalog_service.event_by_slug(&slug).await?;
    let tiers = state.catalog_service.tiers_for_event(event.id).await?;
    let data: Vec<TierDto> = tiers.into_iter().map(TierDto::from).collect();
    Ok(Json(data))
}

/// Catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/{slug}", get(get_event))
        .route("/events/{slug}/ticket-types", post(create_tier).get(list_tiers))
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
    use crate::domain::{EventBus, NewEvent, SignatureVerifier};
    use crate::gateway::MockPaymentGateway;
    use crate::persistence::{BookingStore, InMemoryBookingStore};
    use crate::service::{BookingService, CatalogService};

    fn make_state() -> (AppState, Arc<InMemoryBookingStore>) {
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

    async fn seed_event(store: &InMemoryBookingStore, title: &str, slug: &str, status: EventStatus) {
        store
            .create_event(
                &NewEvent {
                    title: title.to_string(),
                    description: None,
                    venue: None,
                    status,
                    primary_image: None,
                    starts_at: Utc::now() + chrono::Duration::days(30),
                    ends_at: None,
                },
                slug,
            )
            .await
            .unwrap();
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn listing_defaults_to_published_and_paginates() {
        let (state, store) = make_state();
        seed_event(&store, "Jazz Night", "jazz-night", EventStatus::Published).await;
        seed_event(&store, "Rock Gala", "rock-gala", EventStatus::Published).await;
        seed_event(&store, "Secret Show", "secret-show", EventStatus::Draft).await;

        let response = list_events(
            State(state),
            Query(PaginationParams { page: 1, per_page: 1 }),
            Query(EventListQuery { status: None }),
        )
        .await;
        let Ok(response) = response else {
            panic!("listing failed");
        };
        let body = body_json(response.into_response()).await;

        let Some(data) = body.get("data").and_then(|d| d.as_array()) else {
            panic!("missing data array");
        };
        assert_eq!(data.len(), 1);
        assert!(
            data.iter()
                .all(|e| e.get("status").and_then(|s| s.as_str()) == Some("PUBLISHED"))
        );
        let Some(pagination) = body.get("pagination") else {
            panic!("missing pagination");
        };
        assert_eq!(
            pagination.get("total").and_then(serde_json::Value::as_u64),
            Some(2)
        );
        assert_eq!(
            pagination.get("total_pages").and_then(serde_json::Value::as_u64),
            Some(2)
        );
    }

    #[tokio::test]
    async fn unknown_status_filter_is_rejected() {
        let (state, _store) = make_state();
        let response = list_events(
            State(state),
            Query(PaginationParams { page: 1, per_page: 20 }),
            Query(EventListQuery {
                status: Some("CANCELLED".to_string()),
            }),
        )
        .await;
        assert!(matches!(response, Err(BoxofficeError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn tier_routes_resolve_the_event_by_slug() {
        let (state, store) = make_state();
        seed_event(&store, "Jazz Night", "jazz-night", EventStatus::Published).await;

        let created = create_tier(
            State(state.clone()),
            AuthenticatedUser(crate::domain::UserId::from_uuid(uuid::Uuid::new_v4())),
            Path("jazz-night".to_string()),
            Json(CreateTierRequest {
                name: "Balcony".to_string(),
                price: Decimal::new(7_500, 2),
                quantity: 40,
            }),
        )
        .await;
        assert!(created.is_ok());

        let missing = list_tiers(State(state), Path("no-such-event".to_string())).await;
        assert!(matches!(missing, Err(BoxofficeError::EventNotFound(_))));
    }
}
