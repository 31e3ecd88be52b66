//! Catalog records: events and the ticket tiers sold for them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EventId, TierId};

/// Publication state of a catalog event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Visible to organizers only; not bookable.
    Draft,
    /// Listed publicly and open for booking.
    Published,
}

impl EventStatus {
    /// Returns the canonical storage string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
        }
    }

    /// Parses a storage string back into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "PUBLISHED" => Some(Self::Published),
            _ => None,
        }
    }
}

/// A catalog event buyers can book tickets for.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Unique event identifier (immutable after creation).
    pub id: EventId,
    /// Display title.
    pub title: String,
    /// URL-safe unique slug derived from the title.
    pub slug: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Optional venue name.
    pub venue: Option<String>,
    /// Publication state.
    pub status: EventStatus,
    /// Optional hero image URL.
    pub primary_image: Option<String>,
    /// When the event starts.
    pub starts_at: DateTime<Utc>,
    /// When the event ends, if scheduled.
    pub ends_at: Option<DateTime<Utc>>,
    /// Creation timestamp (immutable after creation).
    pub created_at: DateTime<Utc>,
    /// Timestamp of last mutation.
    pub updated_at: DateTime<Utc>,
}

/// Input record for creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    /// Display title; the slug is derived from it.
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Optional venue name.
    pub venue: Option<String>,
    /// Publication state at creation time.
    pub status: EventStatus,
    /// Optional hero image URL.
    pub primary_image: Option<String>,
    /// When the event starts.
    pub starts_at: DateTime<Utc>,
    /// When the event ends, if scheduled.
    pub ends_at: Option<DateTime<Utc>>,
}

/// A sellable ticket tier of an event.
///
/// `remaining_quantity` is the authoritative inventory count. It only
/// decreases inside a reservation transaction and only increases inside a
/// compensating transaction, and the storage layer enforces that it never
/// goes negative.
#[derive(Debug, Clone, Serialize)]
pub struct TicketTier {
    /// Unique tier identifier (immutable after creation).
    pub id: TierId,
    /// Event this tier belongs to.
    pub event_id: EventId,
    /// Display name (e.g. `"General Admission"`).
    pub name: String,
    /// Unit price in the platform currency.
    pub price: Decimal,
    /// Authoritative count of units still sellable.
    pub remaining_quantity: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last mutation.
    pub updated_at: DateTime<Utc>,
}

/// Input record for creating a ticket tier.
#[derive(Debug, Clone)]
pub struct NewTicketTier {
    /// Display name.
    pub name: String,
    /// Unit price in the platform currency.
    pub price: Decimal,
    /// Initial inventory count.
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_storage_round_trip() {
        for status in [EventStatus::Draft, EventStatus::Published] {
            assert_eq!(EventStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(EventStatus::parse("CANCELLED"), None);
        assert_eq!(EventStatus::parse("draft"), None);
    }
}
