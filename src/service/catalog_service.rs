//! Catalog service: events and their ticket tiers.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::{
    Event, EventId, EventStatus, NewEvent, NewTicketTier, TicketTier, slug_from_title,
};
use crate::error::BoxofficeError;
use crate::persistence::BookingStore;

/// Thin orchestration layer over the catalog side of the store: slug
/// derivation and input validation live here, storage in the
/// [`BookingStore`].
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: Arc<dyn BookingStore>,
}

impl CatalogService {
    /// Creates a new `CatalogService`.
    #[must_use]
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Creates an event. The slug is derived from the title and must be
    /// unique.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidRequest`] when the title yields an
    /// empty slug or the slug is already taken, and
    /// [`BoxofficeError::PersistenceError`] on storage failure.
    pub async fn create_event(&self, new: &NewEvent) -> Result<Event, BoxofficeError> {
        let slug = slug_from_title(&new.title);
        if slug.is_empty() {
            return Err(BoxofficeError::InvalidRequest(
                "event title must contain at least one word".to_string(),
            ));
        }

        let event = self.store.create_event(new, &slug).await?;
        tracing::info!(event_id = %event.id, slug = %event.slug, "event created");
        Ok(event)
    }

    /// Lists events, optionally filtered by status, ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::PersistenceError`] on storage failure.
    pub async fn list_events(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, BoxofficeError> {
        self.store.list_events(status).await
    }

    /// Looks up an event by slug.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::EventNotFound`] when no event has the
    /// slug.
    pub async fn event_by_slug(&self, slug: &str) -> Result<Event, BoxofficeError> {
        self.store.event_by_slug(slug).await
    }

    /// Looks up an event by slug together with its tiers, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::EventNotFound`] when no event has the
    /// slug.
    pub async fn event_with_tiers(
        &self,
        slug: &str,
    ) -> Result<(Event, Vec<TicketTier>), BoxofficeError> {
        let event = self.store.event_by_slug(slug).await?;
        let tiers = self.store.tiers_for_event(event.id).await?;
        Ok((event, tiers))
    }

    /// Creates a ticket tier under an event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::InvalidRequest`] for a blank name, a
    /// negative price, or a negative quantity, and
    /// [`BoxofficeError::EventNotFound`] when the event does not exist.
    pub async fn create_tier(
        &self,
        event_id: EventId,
        new: &NewTicketTier,
    ) -> Result<TicketTier, BoxofficeError> {
        if new.name.trim().is_empty() {
            return Err(BoxofficeError::InvalidRequest(
                "tier name must not be blank".to_string(),
            ));
        }
        if new.price < Decimal::ZERO {
            return Err(BoxofficeError::InvalidRequest(
                "tier price must not be negative".to_string(),
            ));
        }
        if new.quantity < 0 {
            return Err(BoxofficeError::InvalidRequest(
                "tier quantity must not be negative".to_string(),
            ));
        }

        let tier = self.store.create_tier(event_id, new).await?;
        tracing::info!(tier_id = %tier.id, event_id = %event_id, name = %tier.name, "tier created");
        Ok(tier)
    }

    /// Lists the tiers of an event, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::EventNotFound`] when the event does not
    /// exist.
    pub async fn tiers_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<TicketTier>, BoxofficeError> {
        self.store.tiers_for_event(event_id).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::persistence::InMemoryBookingStore;

    fn make_service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryBookingStore::new()))
    }

    fn sample_event(title: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: Some("Three days of live music".to_string()),
            venue: Some("Riverside Park".to_string()),
            status: EventStatus::Published,
            primary_image: None,
            starts_at: Utc::now() + chrono::Duration::days(30),
            ends_at: None,
        }
    }

    #[tokio::test]
    async fn create_event_derives_slug_from_title() {
        let service = make_service();

        let event = service.create_event(&sample_event("Summer  Music Festival")).await;
        let Ok(event) = event else {
            panic!("event creation failed");
        };
        assert_eq!(event.slug, "summer-music-festival");
    }

    #[tokio::test]
    async fn create_event_rejects_blank_title() {
        let service = make_service();

        let result = service.create_event(&sample_event("   ")).await;
        assert!(matches!(result, Err(BoxofficeError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn duplicate_titles_collide_on_slug() {
        let service = make_service();

        let first = service.create_event(&sample_event("Summer Music Festival")).await;
        assert!(first.is_ok());

        let second = service.create_event(&sample_event("Summer Music Festival")).await;
        assert!(matches!(second, Err(BoxofficeError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn create_tier_validates_inputs() {
        let service = make_service();
        let event = service.create_event(&sample_event("Summer Music Festival")).await;
        let Ok(event) = event else {
            panic!("event creation failed");
        };

        let negative_price = service
            .create_tier(
                event.id,
                &NewTicketTier {
                    name: "General Admission".to_string(),
                    price: Decimal::new(-1, 0),
                    quantity: 10,
                },
            )
            .await;
        assert!(matches!(
            negative_price,
            Err(BoxofficeError::InvalidRequest(_))
        ));

        let negative_quantity = service
            .create_tier(
                event.id,
                &NewTicketTier {
                    name: "General Admission".to_string(),
                    price: Decimal::new(5_000, 2),
                    quantity: -1,
                },
            )
            .await;
        assert!(matches!(
            negative_quantity,
            Err(BoxofficeError::InvalidRequest(_))
        ));

        let unknown_event = service
            .create_tier(
                EventId::new(),
                &NewTicketTier {
                    name: "General Admission".to_string(),
                    price: Decimal::new(5_000, 2),
                    quantity: 10,
                },
            )
            .await;
        assert!(matches!(
            unknown_event,
            Err(BoxofficeError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn event_with_tiers_returns_cheapest_first() {
        let service = make_service();
        let event = service.create_event(&sample_event("Summer Music Festival")).await;
        let Ok(event) = event else {
            panic!("event creation failed");
        };

        let vip = service
            .create_tier(
                event.id,
                &NewTicketTier {
                    name: "VIP".to_string(),
                    price: Decimal::new(20_000, 2),
                    quantity: 20,
                },
            )
            .await;
        assert!(vip.is_ok());
        let ga = service
            .create_tier(
                event.id,
                &NewTicketTier {
                    name: "General Admission".to_string(),
                    price: Decimal::new(5_000, 2),
                    quantity: 100,
                },
            )
            .await;
        assert!(ga.is_ok());

        let found = service.event_with_tiers("summer-music-festival").await;
        let Ok((found_event, tiers)) = found else {
            panic!("lookup failed");
        };
        assert_eq!(found_event.id, event.id);
        assert_eq!(tiers.len(), 2);
        assert_eq!(
            tiers.first().map(|t| t.name.as_str()),
            Some("General Admission")
        );
    }

    #[tokio::test]
    async fn list_events_filters_by_status() {
        let service = make_service();

        let published = service.create_event(&sample_event("Summer Music Festival")).await;
        assert!(published.is_ok());

        let mut draft = sample_event("Winter Jazz Nights");
        draft.status = EventStatus::Draft;
        let draft = service.create_event(&draft).await;
        assert!(draft.is_ok());

        let all = service.list_events(None).await;
        assert_eq!(all.ok().map(|e| e.len()), Some(2));

        let published_only = service.list_events(Some(EventStatus::Published)).await;
        let Ok(published_only) = published_only else {
            panic!("listing failed");
        };
        assert_eq!(published_only.len(), 1);
        assert_eq!(
            published_only.first().map(|e| e.slug.as_str()),
            Some("summer-music-festival")
        );
    }
}
