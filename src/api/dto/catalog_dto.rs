//! DTOs for the catalog endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PaginationMeta;
use crate::domain::{Event, EventStatus, NewEvent, NewTicketTier, TicketTier};
use crate::error::BoxofficeError;

/// Request body for `POST /events`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    /// Display title; the slug is derived from it.
    pub title: String,
    /// Optional long-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional venue name.
    #[serde(default)]
    pub venue: Option<String>,
    /// Publication state (`"DRAFT"` or `"PUBLISHED"`). Defaults to draft.
    #[serde(default)]
    pub status: Option<String>,
    /// Optional hero image URL.
    #[serde(default)]
    pub primary_image: Option<String>,
    /// When the event starts.
    pub starts_at: DateTime<Utc>,
    /// When the event ends, if scheduled.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

impl CreateEventRequest {
    /// Converts the request into a domain input record.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidRequest`] for an unknown status
    /// string.
    pub fn into_new_event(self) -> Result<NewEvent, BoxofficeError> {
        let status = match self.status.as_deref() {
            None => EventStatus::Draft,
            Some(s) => EventStatus::parse(s).ok_or_else(|| {
                BoxofficeError::InvalidRequest(format!("unknown event status '{s}'"))
            })?,
        };
        Ok(NewEvent {
            title: self.title,
            description: self.description,
            venue: self.venue,
            status,
            primary_image: self.primary_image,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
        })
    }
}

/// An event in API responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventDto {
    /// Event identifier.
    pub id: uuid::Uuid,
    /// Display title.
    pub title: String,
    /// URL-safe unique slug.
    pub slug: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Optional venue name.
    pub venue: Option<String>,
    /// Publication state.
    pub status: String,
    /// Optional hero image URL.
    pub primary_image: Option<String>,
    /// When the event starts.
    pub starts_at: DateTime<Utc>,
    /// When the event ends, if scheduled.
    pub ends_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventDto {
    fn from(event: Event) -> Self {
        Self {
            id: uuid::Uuid::from(event.id),
            title: event.title,
            slug: event.slug,
            description: event.description,
            venue: event.venue,
            status: event.status.as_str().to_string(),
            primary_image: event.primary_image,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            created_at: event.created_at,
        }
    }
}

/// Response body for `GET /events`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events on this page.
    pub data: Vec<EventDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// A ticket tier in API responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TierDto {
    /// Tier identifier.
    pub id: uuid::Uuid,
    /// Event this tier belongs to.
    pub event_id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Unit price in the platform currency.
    pub price: Decimal,
    /// Units still sellable.
    pub remaining_quantity: i32,
}

impl From<TicketTier> for TierDto {
    fn from(tier: TicketTier) -> Self {
        Self {
            id: uuid::Uuid::from(tier.id),
            event_id: uuid::Uuid::from(tier.event_id),
            name: tier.name,
            price: tier.price,
            remaining_quantity: tier.remaining_quantity,
        }
    }
}

/// Response body for `GET /events/{slug}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventDetailResponse {
    /// The event.
    pub event: EventDto,
    /// Its tiers, cheapest first.
    pub ticket_types: Vec<TierDto>,
}

/// Request body for `POST /events/{slug}/ticket-types`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTierRequest {
    /// Display name.
    pub name: String,
    /// Unit price in the platform currency.
    pub price: Decimal,
    /// Initial inventory count.
    pub quantity: i32,
}

impl CreateTierRequest {
    /// Converts the request into a domain input record.
    #[must_use]
    pub fn into_new_tier(self) -> NewTicketTier {
        NewTicketTier {
            name: self.name,
            price: self.price,
            quantity: self.quantity,
        }
    }
}

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventListQuery {
    /// Optional status filter (`"DRAFT"` or `"PUBLISHED"`). Defaults to
    /// published, the public listing.
    #[serde(default)]
    pub status: Option<String>,
}
