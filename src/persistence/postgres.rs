//! PostgreSQL implementation of the booking store.
//!
//! Inventory mutations run inside explicit transactions. Tier rows are
//! locked with `SELECT ... FOR UPDATE` in `TierId` order, and the
//! `PENDING -> COMPLETED` transition is a single conditional `UPDATE`
//! so concurrent finalization attempts resolve to exactly one winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::BookingStore;
use crate::domain::{
    BookingItem, BookingSummary, Event, EventId, EventStatus, FinalizedOrder, NewEvent,
    NewTicketTier, Order, OrderId, OrderItem, OrderStatus, ReservationLine, ReservedOrder,
    TicketTier, TierId, UserId,
};
use crate::error::BoxofficeError;

/// PostgreSQL-backed booking store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type EventRow = (
    Uuid,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
);

const EVENT_COLUMNS: &str = "id, title, slug, description, venue, status, primary_image, \
     starts_at, ends_at, created_at, updated_at";

fn event_from_row(row: EventRow) -> Result<Event, BoxofficeError> {
    let (
        id,
        title,
        slug,
        description,
        venue,
        status,
        primary_image,
        starts_at,
        ends_at,
        created_at,
        updated_at,
    ) = row;
    let status = EventStatus::parse(&status)
        .ok_or_else(|| BoxofficeError::PersistenceError(format!("unknown event status: {status}")))?;
    Ok(Event {
        id: EventId::from_uuid(id),
        title,
        slug,
        description,
        venue,
        status,
        primary_image,
        starts_at,
        ends_at,
        created_at,
        updated_at,
    })
}

type OrderRow = (
    Uuid,
    Uuid,
    Decimal,
    String,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn order_from_row(row: OrderRow) -> Result<Order, BoxofficeError> {
    let (id, user_id, total_amount, status, payment_order_ref, payment_ref, created_at, updated_at) =
        row;
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| BoxofficeError::PersistenceError(format!("unknown order status: {status}")))?;
    Ok(Order {
        id: OrderId::from_uuid(id),
        user_id: UserId::from_uuid(user_id),
        total_amount,
        status,
        payment_order_ref,
        payment_ref,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn create_event(&self, new: &NewEvent, slug: &str) -> Result<Event, BoxofficeError> {
        let id = EventId::new();
        let (created_at, updated_at) = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
            "INSERT INTO events (id, title, slug, description, venue, status, primary_image, starts_at, ends_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING created_at, updated_at",
        )
        .bind(id.as_uuid())
        .bind(&new.title)
        .bind(slug)
        .bind(&new.description)
        .bind(&new.venue)
        .bind(new.status.as_str())
        .bind(&new.primary_image)
        .bind(new.starts_at)
        .bind(new.ends_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                BoxofficeError::InvalidRequest(format!("an event with slug '{slug}' already exists"))
            }
            _ => BoxofficeError::PersistenceError(e.to_string()),
        })?;

        Ok(Event {
            id,
            title: new.title.clone(),
            slug: slug.to_string(),
            description: new.description.clone(),
            venue: new.venue.clone(),
            status: new.status,
            primary_image: new.primary_image.clone(),
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            created_at,
            updated_at,
        })
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Event, BoxofficeError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        match row {
            Some(row) => event_from_row(row),
            None => Err(BoxofficeError::EventNotFound(slug.to_string())),
        }
    }

    async fn list_events(
        &self,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, BoxofficeError> {
        let rows = if let Some(status) = status {
            sqlx::query_as::<_, EventRow>(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE status = $1 ORDER BY starts_at ASC"
            ))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, EventRow>(&format!(
                "SELECT {EVENT_COLUMNS} FROM events ORDER BY starts_at ASC"
            ))
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        rows.into_iter().map(event_from_row).collect()
    }

    async fn create_tier(
        &self,
        event_id: EventId,
        new: &NewTicketTier,
    ) -> Result<TicketTier, BoxofficeError> {
        let id = TierId::new();
        let (created_at, updated_at) = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
            "INSERT INTO ticket_types (id, event_id, name, price, remaining_quantity) \
             VALUES ($1, $2, $3, $4, $5) RETURNING created_at, updated_at",
        )
        .bind(id.as_uuid())
        .bind(event_id.as_uuid())
        .bind(&new.name)
        .bind(new.price)
        .bind(new.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                BoxofficeError::EventNotFound(event_id.to_string())
            }
            _ => BoxofficeError::PersistenceError(e.to_string()),
        })?;

        Ok(TicketTier {
            id,
            event_id,
            name: new.name.clone(),
            price: new.price,
            remaining_quantity: new.quantity,
            created_at,
            updated_at,
        })
    }

    async fn tiers_for_event(&self, event_id: EventId) -> Result<Vec<TicketTier>, BoxofficeError> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE id = $1")
            .bind(event_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;
        if exists == 0 {
            return Err(BoxofficeError::EventNotFound(event_id.to_string()));
        }

        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, Decimal, i32, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT id, event_id, name, price, remaining_quantity, created_at, updated_at \
             FROM ticket_types WHERE event_id = $1 ORDER BY price ASC",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, event_id, name, price, remaining_quantity, created_at, updated_at)| {
                    TicketTier {
                        id: TierId::from_uuid(id),
                        event_id: EventId::from_uuid(event_id),
                        name,
                        price,
                        remaining_quantity,
                        created_at,
                        updated_at,
                    }
                },
            )
            .collect())
    }

    async fn tier(&self, tier_id: TierId) -> Result<TicketTier, BoxofficeError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, String, Decimal, i32, DateTime<Utc>, DateTime<Utc>)>(
            "SELECT id, event_id, name, price, remaining_quantity, created_at, updated_at \
             FROM ticket_types WHERE id = $1",
        )
        .bind(tier_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        let Some((id, event_id, name, price, remaining_quantity, created_at, updated_at)) = row
        else {
            return Err(BoxofficeError::TierNotFound(*tier_id.as_uuid()));
        };

        Ok(TicketTier {
            id: TierId::from_uuid(id),
            event_id: EventId::from_uuid(event_id),
            name,
            price,
            remaining_quantity,
            created_at,
            updated_at,
        })
    }

    async fn reserve(
        &self,
        user_id: UserId,
        lines: &[ReservationLine],
    ) -> Result<ReservedOrder, BoxofficeError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        // Stable lock order across concurrent reservations.
        let mut sorted = lines.to_vec();
        sorted.sort_by_key(|line| line.tier_id);

        let mut total = Decimal::ZERO;
        let mut priced: Vec<(TierId, i32, Decimal)> = Vec::with_capacity(sorted.len());
        for line in &sorted {
            let row = sqlx::query_as::<_, (String, Decimal, i32)>(
                "SELECT name, price, remaining_quantity FROM ticket_types WHERE id = $1 FOR UPDATE",
            )
            .bind(line.tier_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

            let Some((name, price, remaining)) = row else {
                let _ = tx.rollback().await;
                return Err(BoxofficeError::TierNotFound(*line.tier_id.as_uuid()));
            };

            if remaining < line.quantity {
                let _ = tx.rollback().await;
                return Err(BoxofficeError::InsufficientAvailability {
                    tier_name: name,
                    available: remaining,
                });
            }

            sqlx::query(
                "UPDATE ticket_types SET remaining_quantity = remaining_quantity - $2, \
                 updated_at = NOW() WHERE id = $1",
            )
            .bind(line.tier_id.as_uuid())
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

            total += price * Decimal::from(line.quantity);
            priced.push((line.tier_id, line.quantity, price));
        }

        let order_id = OrderId::new();
        let (created_at, updated_at) = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
            "INSERT INTO orders (id, user_id, total_amount, status) \
             VALUES ($1, $2, $3, 'PENDING') RETURNING created_at, updated_at",
        )
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(total)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        let mut items = Vec::with_capacity(priced.len());
        for (tier_id, quantity, price) in priced {
            let item_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO order_items (id, order_id, ticket_type_id, quantity, price_at_purchase) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item_id)
            .bind(order_id.as_uuid())
            .bind(tier_id.as_uuid())
            .bind(quantity)
            .bind(price)
            .execute(&mut *tx)
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

            items.push(OrderItem {
                id: item_id,
                order_id,
                ticket_type_id: tier_id,
                quantity,
                price_at_purchase: price,
            });
        }

        tx.commit()
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        Ok(ReservedOrder {
            order: Order {
                id: order_id,
                user_id,
                total_amount: total,
                status: OrderStatus::Pending,
                payment_order_ref: None,
                payment_ref: None,
                created_at,
                updated_at,
            },
            items,
        })
    }

    async fn attach_payment_order(
        &self,
        order_id: OrderId,
        payment_order_ref: &str,
    ) -> Result<(), BoxofficeError> {
        let result = sqlx::query(
            "UPDATE orders SET payment_order_ref = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .bind(payment_order_ref)
        .execute(&self.pool)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(BoxofficeError::OrderNotFound(order_id.to_string()));
        }
        Ok(())
    }

    async fn abort_pending_order(&self, order_id: OrderId) -> Result<(), BoxofficeError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        let items = sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT ticket_type_id, quantity FROM order_items WHERE order_id = $1",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        // Deleting first makes a repeated abort a no-op: once the order is
        // gone, inventory is not restored a second time.
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1 AND status = 'PENDING'")
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        if deleted.rows_affected() == 0 {
            let _ = tx.rollback().await;
            return Ok(());
        }

        for (tier_id, quantity) in items {
            sqlx::query(
                "UPDATE ticket_types SET remaining_quantity = remaining_quantity + $2, \
                 updated_at = NOW() WHERE id = $1",
            )
            .bind(tier_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;
        Ok(())
    }

    async fn finalize_order(
        &self,
        payment_order_ref: &str,
        payment_ref: &str,
    ) -> Result<Option<FinalizedOrder>, BoxofficeError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        // Conditional transition: zero rows means the reference is unknown
        // or the order is already COMPLETED, and the caller acknowledges
        // without changing anything.
        let row = sqlx::query_as::<_, (Uuid, Uuid, Decimal, Option<String>, Option<String>, DateTime<Utc>, DateTime<Utc>)>(
            "UPDATE orders SET status = 'COMPLETED', payment_ref = $2, updated_at = NOW() \
             WHERE payment_order_ref = $1 AND status = 'PENDING' \
             RETURNING id, user_id, total_amount, payment_order_ref, payment_ref, created_at, updated_at",
        )
        .bind(payment_order_ref)
        .bind(payment_ref)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        let Some((id, user_id, total_amount, po_ref, p_ref, created_at, updated_at)) = row else {
            let _ = tx.rollback().await;
            return Ok(None);
        };

        let item_rows = sqlx::query_as::<_, (Uuid, i32, Uuid)>(
            "SELECT oi.ticket_type_id, oi.quantity, tt.event_id \
             FROM order_items oi JOIN ticket_types tt ON tt.id = oi.ticket_type_id \
             WHERE oi.order_id = $1",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        let mut registrations_created: u32 = 0;
        let mut lines = Vec::with_capacity(item_rows.len());
        for (tier_id, quantity, event_id) in item_rows {
            for _ in 0..quantity {
                sqlx::query(
                    "INSERT INTO event_registrations (id, order_id, user_id, event_id, ticket_type_id) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(Uuid::new_v4())
                .bind(id)
                .bind(user_id)
                .bind(event_id)
                .bind(tier_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;
                registrations_created += 1;
            }
            lines.push(ReservationLine {
                tier_id: TierId::from_uuid(tier_id),
                quantity,
            });
        }

        tx.commit()
            .await
            .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        Ok(Some(FinalizedOrder {
            order: Order {
                id: OrderId::from_uuid(id),
                user_id: UserId::from_uuid(user_id),
                total_amount,
                status: OrderStatus::Completed,
                payment_order_ref: po_ref,
                payment_ref: p_ref,
                created_at,
                updated_at,
            },
            lines,
            registrations_created,
        }))
    }

    async fn order_by_payment_order_ref(
        &self,
        payment_order_ref: &str,
    ) -> Result<Option<Order>, BoxofficeError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, total_amount, status, payment_order_ref, payment_ref, \
             created_at, updated_at FROM orders WHERE payment_order_ref = $1",
        )
        .bind(payment_order_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        row.map(order_from_row).transpose()
    }

    async fn completed_bookings(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BookingSummary>, BoxofficeError> {
        let rows = sqlx::query_as::<_, (Uuid, Decimal, Option<String>, DateTime<Utc>, Uuid, i32, Decimal, String, String)>(
            "SELECT o.id, o.total_amount, o.payment_order_ref, o.created_at, \
                    oi.ticket_type_id, oi.quantity, oi.price_at_purchase, tt.name, e.title \
             FROM orders o \
             JOIN order_items oi ON oi.order_id = o.id \
             JOIN ticket_types tt ON tt.id = oi.ticket_type_id \
             JOIN events e ON e.id = tt.event_id \
             WHERE o.user_id = $1 AND o.status = 'COMPLETED' \
             ORDER BY o.created_at DESC, o.id",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        let mut summaries: Vec<BookingSummary> = Vec::new();
        for (order_id, total_amount, payment_order_ref, created_at, tier_id, quantity, price, tier_name, event_title) in
            rows
        {
            let order_id = OrderId::from_uuid(order_id);
            let item = BookingItem {
                ticket_type_id: TierId::from_uuid(tier_id),
                tier_name,
                event_title,
                quantity,
                price_at_purchase: price,
            };
            match summaries.last_mut() {
                Some(last) if last.id == order_id => last.items.push(item),
                _ => summaries.push(BookingSummary {
                    id: order_id,
                    status: OrderStatus::Completed,
                    total_amount,
                    payment_order_ref,
                    created_at,
                    items: vec![item],
                }),
            }
        }
        Ok(summaries)
    }

    async fn append_event(
        &self,
        order_id: OrderId,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<i64, BoxofficeError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO booking_events (order_id, event_type, payload) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(order_id.as_uuid())
        .bind(event_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| BoxofficeError::PersistenceError(e.to_string()))?;

        Ok(id)
    }
}
