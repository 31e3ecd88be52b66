//! In-memory booking store.
//!
//! Backs tests and local development without PostgreSQL. A single
//! `RwLock` around the whole state stands in for the database's
//! transactions: every mutating operation validates first and mutates
//! second while holding the write guard, so the all-or-nothing and
//! exactly-one-winner guarantees hold here too.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::BookingStore;
use crate::domain::{
    BookingItem, BookingSummary, Event, EventId, EventRegistration, EventStatus, FinalizedOrder,
    NewEvent, NewTicketTier, Order, OrderId, OrderItem, OrderStatus, ReservationLine,
    ReservedOrder, TicketTier, TierId, UserId,
};
use crate::error::BoxofficeError;

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<EventId, Event>,
    tiers: HashMap<TierId, TicketTier>,
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
    registrations: Vec<EventRegistration>,
    event_log: Vec<(i64, OrderId, String, serde_json::Value)>,
}

/// In-memory [`BookingStore`] backed by a `RwLock`-guarded state.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    inner: RwLock<Inner>,
}

impl InMemoryBookingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registrations materialized for an order.
    pub async fn registrations_for_order(&self, order_id: OrderId) -> Vec<EventRegistration> {
        let inner = self.inner.read().await;
        inner
            .registrations
            .iter()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect()
    }

    /// Returns the number of event-log entries appended so far.
    pub async fn event_log_len(&self) -> usize {
        self.inner.read().await.event_log.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn create_event(&self, new: &NewEvent, slug: &str) -> Result<Event, BoxofficeError> {
        let mut inner = self.inner.write().await;
        if inner.events.values().any(|e| e.slug == slug) {
            return Err(BoxofficeError::InvalidRequest(format!(
                "an event with slug '{slug}' already exists"
            )));
        }
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            title: new.title.clone(),
            slug: slug.to_string(),
            description: new.description.clone(),
            venue: new.venue.clone(),
            status: new.status,
            primary_image: new.primary_image.clone(),
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            created_at: now,
            updated_at: now,
        };
        inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Event, BoxofficeError> {
        let inner = self.inner.read().await;
        inner
            .events
            .values()
            .find(|e| e.slug == slug)
            .cloned()
            .ok_or_else(|| BoxofficeError::EventNotFound(slug.to_string()))
    }

    async fn list_events(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, BoxofficeError> {
        let inner = self.inner.read().await;
        let mut events: Vec<Event> = inner
            .events
            .values()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn create_tier(
        &self,
        event_id: EventId,
        new: &NewTicketTier,
    ) -> Result<TicketTier, BoxofficeError> {
        let mut inner = self.inner.write().await;
        if !inner.events.contains_key(&event_id) {
            return Err(BoxofficeError::EventNotFound(event_id.to_string()));
        }
        let now = Utc::now();
        let tier = TicketTier {
            id: TierId::new(),
            event_id,
            name: new.name.clone(),
            price: new.price,
            remaining_quantity: new.quantity,
            created_at: now,
            updated_at: now,
        };
        inner.tiers.insert(tier.id, tier.clone());
        Ok(tier)
    }

    async fn tiers_for_event(&self, event_id: EventId) -> Result<Vec<TicketTier>, BoxofficeError> {
        let inner = self.inner.read().await;
        if !inner.events.contains_key(&event_id) {
            return Err(BoxofficeError::EventNotFound(event_id.to_string()));
        }
        let mut tiers: Vec<TicketTier> = inner
            .tiers
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect();
        tiers.sort_by_key(|t| t.price);
        Ok(tiers)
    }

    async fn tier(&self, tier_id: TierId) -> Result<TicketTier, BoxofficeError> {
        let inner = self.inner.read().await;
        inner
            .tiers
            .get(&tier_id)
            .cloned()
            .ok_or(BoxofficeError::TierNotFound(*tier_id.as_uuid()))
    }

    async fn reserve(
        &self,
        user_id: UserId,
        lines: &[ReservationLine],
    ) -> Result<ReservedOrder, BoxofficeError> {
        let mut inner = self.inner.write().await;

        let mut sorted = lines.to_vec();
        sorted.sort_by_key(|line| line.tier_id);

        // Validate every line before touching any counter.
        let mut total = Decimal::ZERO;
        let mut priced: Vec<(TierId, i32, Decimal)> = Vec::with_capacity(sorted.len());
        let mut pending_debits: HashMap<TierId, i32> = HashMap::new();
        for line in &sorted {
            let tier = inner
                .tiers
                .get(&line.tier_id)
                .ok_or(BoxofficeError::TierNotFound(*line.tier_id.as_uuid()))?;
            let already_debited = pending_debits.get(&line.tier_id).copied().unwrap_or(0);
            if tier.remaining_quantity - already_debited < line.quantity {
                return Err(BoxofficeError::InsufficientAvailability {
                    tier_name: tier.name.clone(),
                    available: tier.remaining_quantity - already_debited,
                });
            }
            *pending_debits.entry(line.tier_id).or_insert(0) += line.quantity;
            total += tier.price * Decimal::from(line.quantity);
            priced.push((line.tier_id, line.quantity, tier.price));
        }

        let now = Utc::now();
        for (tier_id, quantity, _) in &priced {
            if let Some(tier) = inner.tiers.get_mut(tier_id) {
                tier.remaining_quantity -= quantity;
                tier.updated_at = now;
            }
        }

        let order = Order {
            id: OrderId::new(),
            user_id,
            total_amount: total,
            status: OrderStatus::Pending,
            payment_order_ref: None,
            payment_ref: None,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = priced
            .into_iter()
            .map(|(tier_id, quantity, price)| OrderItem {
                id: uuid::Uuid::new_v4(),
                order_id: order.id,
                ticket_type_id: tier_id,
                quantity,
                price_at_purchase: price,
            })
            .collect();

        inner.orders.insert(order.id, order.clone());
        inner.items.insert(order.id, items.clone());
        Ok(ReservedOrder { order, items })
    }

    async fn attach_payment_order(
        &self,
        order_id: OrderId,
        payment_order_ref: &str,
    ) -> Result<(), BoxofficeError> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| BoxofficeError::OrderNotFound(order_id.to_string()))?;
        order.payment_order_ref = Some(payment_order_ref.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn abort_pending_order(&self, order_id: OrderId) -> Result<(), BoxofficeError> {
        let mut inner = self.inner.write().await;
        match inner.orders.get(&order_id) {
            Some(order) if order.status == OrderStatus::Pending => {}
            _ => return Ok(()),
        }

        let items = inner.items.remove(&order_id).unwrap_or_default();
        inner.orders.remove(&order_id);
        let now = Utc::now();
        for item in items {
            if let Some(tier) = inner.tiers.get_mut(&item.ticket_type_id) {
                tier.remaining_quantity += item.quantity;
                tier.updated_at = now;
            }
        }
        Ok(())
    }

    async fn finalize_order(
        &self,
        payment_order_ref: &str,
        payment_ref: &str,
    ) -> Result<Option<FinalizedOrder>, BoxofficeError> {
        let mut inner = self.inner.write().await;

        let order_id = inner
            .orders
            .values()
            .find(|o| {
                o.status == OrderStatus::Pending
                    && o.payment_order_ref.as_deref() == Some(payment_order_ref)
            })
            .map(|o| o.id);
        let Some(order_id) = order_id else {
            return Ok(None);
        };

        let items = inner.items.get(&order_id).cloned().unwrap_or_default();
        let now = Utc::now();

        let mut new_registrations = Vec::new();
        let mut lines = Vec::with_capacity(items.len());
        let order_user = match inner.orders.get(&order_id) {
            Some(order) => order.user_id,
            None => return Ok(None),
        };
        for item in &items {
            let event_id = inner
                .tiers
                .get(&item.ticket_type_id)
                .map(|t| t.event_id)
                .ok_or_else(|| {
                    BoxofficeError::PersistenceError("order item references unknown tier".to_string())
                })?;
            for _ in 0..item.quantity {
                new_registrations.push(EventRegistration {
                    id: uuid::Uuid::new_v4(),
                    order_id,
                    user_id: order_user,
                    event_id,
                    ticket_type_id: item.ticket_type_id,
                    created_at: now,
                });
            }
            lines.push(ReservationLine {
                tier_id: item.ticket_type_id,
                quantity: item.quantity,
            });
        }

        let registrations_created = u32::try_from(new_registrations.len()).unwrap_or(u32::MAX);
        inner.registrations.extend(new_registrations);

        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        order.status = OrderStatus::Completed;
        order.payment_ref = Some(payment_ref.to_string());
        order.updated_at = now;
        let order = order.clone();

        Ok(Some(FinalizedOrder {
            order,
            lines,
            registrations_created,
        }))
    }

    async fn order_by_payment_order_ref(
        &self,
        payment_order_ref: &str,
    ) -> Result<Option<Order>, BoxofficeError> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .find(|o| o.payment_order_ref.as_deref() == Some(payment_order_ref))
            .cloned())
    }

    async fn completed_bookings(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BookingSummary>, BoxofficeError> {
        let inner = self.inner.read().await;
        let mut orders: Vec<&Order> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.status == OrderStatus::Completed)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut summaries = Vec::with_capacity(orders.len());
        for order in orders {
            let mut booking_items = Vec::new();
            for item in inner.items.get(&order.id).map(Vec::as_slice).unwrap_or(&[]) {
                let tier = inner.tiers.get(&item.ticket_type_id).ok_or_else(|| {
                    BoxofficeError::PersistenceError("order item references unknown tier".to_string())
                })?;
                let event_title = inner
                    .events
                    .get(&tier.event_id)
                    .map(|e| e.title.clone())
                    .ok_or_else(|| {
                        BoxofficeError::PersistenceError("tier references unknown event".to_string())
                    })?;
                booking_items.push(BookingItem {
                    ticket_type_id: item.ticket_type_id,
                    tier_name: tier.name.clone(),
                    event_title,
                    quantity: item.quantity,
                    price_at_purchase: item.price_at_purchase,
                });
            }
            summaries.push(BookingSummary {
                id: order.id,
                status: order.status,
                total_amount: order.total_amount,
                payment_order_ref: order.payment_order_ref.clone(),
                created_at: order.created_at,
                items: booking_items,
            });
        }
        Ok(summaries)
    }

    async fn append_event(
        &self,
        order_id: OrderId,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, BoxofficeError> {
        let mut inner = self.inner.write().await;
        let id = i64::try_from(inner.event_log.len()).unwrap_or(i64::MAX) + 1;
        inner
            .event_log
            .push((id, order_id, event_type.to_string(), payload.clone()));
        Ok(id)
    }
}
