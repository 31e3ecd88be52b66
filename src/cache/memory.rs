//! In-memory soft lock and idempotency stores.
//!
//! Used by tests and by local development without a Redis instance. Lock
//! counters carry the same TTL semantics as the Redis store: each entry
//! records an expiry instant and reads as absent once it lapses.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{IdempotencyStore, SoftLockStore, StoredResponse, idempotency_key};
use crate::domain::{TierId, UserId};
use crate::error::BoxofficeError;

/// Mirrors the `SOFT_LOCK_TTL_SECS` default used by the Redis store.
const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// A lock counter together with the instant it stops counting.
#[derive(Debug, Clone, Copy)]
struct LockEntry {
    count: i64,
    expires_at: Instant,
}

/// In-memory [`SoftLockStore`] backed by a `RwLock<HashMap>`.
///
/// Each counter carries an expiry instant, checked on every read, and
/// every acquire re-arms it. Release drops the key once the counter
/// reaches zero, matching the Redis store.
#[derive(Debug)]
pub struct InMemorySoftLockStore {
    ttl: Duration,
    counts: RwLock<HashMap<TierId, LockEntry>>,
}

impl InMemorySoftLockStore {
    /// Creates an empty store with the default ten-minute lock TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Creates an empty store whose locks lapse after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            counts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySoftLockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SoftLockStore for InMemorySoftLockStore {
    async fn locked_count(&self, tier_id: TierId) -> Result<i64, BoxofficeError> {
        let now = Instant::now();
        let counts = self.counts.read().await;
        Ok(counts
            .get(&tier_id)
            .filter(|entry| entry.expires_at > now)
            .map_or(0, |entry| entry.count))
    }

    async fn acquire(&self, tier_id: TierId, quantity: i64) -> Result<(), BoxofficeError> {
        let now = Instant::now();
        let mut counts = self.counts.write().await;
        let entry = counts.entry(tier_id).or_insert(LockEntry {
            count: 0,
            expires_at: now + self.ttl,
        });
        if entry.expires_at <= now {
            entry.count = 0;
        }
        entry.count += quantity;
        entry.expires_at = now + self.ttl;
        Ok(())
    }

    async fn release(&self, tier_id: TierId, quantity: i64) -> Result<(), BoxofficeError> {
        let now = Instant::now();
        let mut counts = self.counts.write().await;
        let count = counts
            .get(&tier_id)
            .filter(|entry| entry.expires_at > now)
            .map_or(0, |entry| entry.count);
        let remaining = count - quantity;

        if remaining > 0 {
            // Partial release keeps the original expiry running.
            if let Some(entry) = counts.get_mut(&tier_id) {
                entry.count = remaining;
            }
        } else {
            counts.remove(&tier_id);
            if remaining < 0 {
                tracing::warn!(
                    %tier_id,
                    remaining,
                    "soft lock released below zero; counter clamped"
                );
            }
        }
        Ok(())
    }
}

/// In-memory [`IdempotencyStore`] backed by a `RwLock<HashMap>`.
///
/// Entries never expire.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    entries: RwLock<HashMap<String, StoredResponse>>,
}

impl InMemoryIdempotencyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<StoredResponse>, BoxofficeError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&idempotency_key(user_id, key)).cloned())
    }

    async fn put(
        &self,
        user_id: UserId,
        key: &str,
        response: &StoredResponse,
    ) -> Result<(), BoxofficeError> {
        let mut entries = self.entries.write().await;
        entries.insert(idempotency_key(user_id, key), response.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_counter_reads_zero() {
        let store = InMemorySoftLockStore::new();
        let count = store.locked_count(TierId::new()).await;
        assert_eq!(count.ok(), Some(0));
    }

    #[tokio::test]
    async fn acquire_accumulates() {
        let store = InMemorySoftLockStore::new();
        let tier = TierId::new();

        let _ = store.acquire(tier, 2).await;
        let _ = store.acquire(tier, 3).await;

        assert_eq!(store.locked_count(tier).await.ok(), Some(5));
    }

    #[tokio::test]
    async fn release_clamps_at_zero() {
        let store = InMemorySoftLockStore::new();
        let tier = TierId::new();

        let _ = store.acquire(tier, 2).await;
        let _ = store.release(tier, 5).await;

        assert_eq!(store.locked_count(tier).await.ok(), Some(0));
    }

    #[tokio::test]
    async fn counters_are_per_tier() {
        let store = InMemorySoftLockStore::new();
        let a = TierId::new();
        let b = TierId::new();

        let _ = store.acquire(a, 4).await;

        assert_eq!(store.locked_count(a).await.ok(), Some(4));
        assert_eq!(store.locked_count(b).await.ok(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_locks_read_zero() {
        let store = InMemorySoftLockStore::with_ttl(Duration::from_secs(60));
        let tier = TierId::new();

        let _ = store.acquire(tier, 3).await;
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.locked_count(tier).await.ok(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_rearms_the_expiry() {
        let store = InMemorySoftLockStore::with_ttl(Duration::from_secs(60));
        let tier = TierId::new();

        let _ = store.acquire(tier, 1).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        let _ = store.acquire(tier, 1).await;
        tokio::time::advance(Duration::from_secs(40)).await;

        // The first lock alone would have lapsed at t=60; the second
        // acquire pushed the whole counter out to t=100.
        assert_eq!(store.locked_count(tier).await.ok(), Some(2));

        tokio::time::advance(Duration::from_secs(21)).await;
        assert_eq!(store.locked_count(tier).await.ok(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_after_expiry_starts_fresh() {
        let store = InMemorySoftLockStore::with_ttl(Duration::from_secs(60));
        let tier = TierId::new();

        let _ = store.acquire(tier, 4).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        let _ = store.acquire(tier, 1).await;

        assert_eq!(store.locked_count(tier).await.ok(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn release_after_expiry_is_a_noop() {
        let store = InMemorySoftLockStore::with_ttl(Duration::from_secs(60));
        let tier = TierId::new();

        let _ = store.acquire(tier, 2).await;
        tokio::time::advance(Duration::from_secs(61)).await;

        let released = store.release(tier, 2).await;
        assert!(released.is_ok());
        assert_eq!(store.locked_count(tier).await.ok(), Some(0));

        // A fresh acquire is unaffected by the stale release.
        let _ = store.acquire(tier, 3).await;
        assert_eq!(store.locked_count(tier).await.ok(), Some(3));
    }

    #[tokio::test]
    async fn releases_without_a_live_lock_never_go_positive() {
        let store = InMemorySoftLockStore::new();
        let tier = TierId::new();

        let (first, second) = tokio::join!(store.release(tier, 5), store.release(tier, 3));
        assert!(first.is_ok());
        assert!(second.is_ok());

        assert_eq!(store.locked_count(tier).await.ok(), Some(0));

        let _ = store.acquire(tier, 2).await;
        assert_eq!(store.locked_count(tier).await.ok(), Some(2));
    }

    #[tokio::test]
    async fn stored_response_round_trips() {
        let store = InMemoryIdempotencyStore::new();
        let user = UserId::from_uuid(uuid::Uuid::new_v4());
        let response = StoredResponse {
            status: 201,
            body: serde_json::json!({"booking_id": "abc"}),
        };

        let _ = store.put(user, "key-1", &response).await;
        let cached = store.get(user, "key-1").await;

        assert_eq!(cached.ok().flatten(), Some(response));
    }

    #[tokio::test]
    async fn keys_are_scoped_by_user() {
        let store = InMemoryIdempotencyStore::new();
        let alice = UserId::from_uuid(uuid::Uuid::new_v4());
        let bob = UserId::from_uuid(uuid::Uuid::new_v4());
        let response = StoredResponse {
            status: 201,
            body: serde_json::json!({"booking_id": "abc"}),
        };

        let _ = store.put(alice, "key-1", &response).await;

        assert_eq!(store.get(bob, "key-1").await.ok().flatten(), None);
    }
}
