//! Cache layer: soft lock counters and the idempotency response cache.
//!
//! Both concerns are advisory. Soft locks narrow the race window between
//! the availability pre-check and the authoritative reservation
//! transaction; the idempotency cache absorbs client retries of the
//! initiation endpoint. Losing either store never corrupts inventory,
//! because the durable store remains the source of truth.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{TierId, UserId};
use crate::error::BoxofficeError;

pub use memory::{InMemoryIdempotencyStore, InMemorySoftLockStore};
pub use redis::{RedisIdempotencyStore, RedisSoftLockStore};

/// Cached outcome of a successfully processed request, replayed verbatim
/// when the same idempotency key arrives again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    /// HTTP status code of the original response.
    pub status: u16,
    /// JSON body of the original response.
    pub body: serde_json::Value,
}

/// Expiring per-tier counters of units held by in-flight reservations.
///
/// A tier's *effective availability* is its authoritative
/// `remaining_quantity` minus the counter kept here. Counters expire after
/// a configured TTL, so reservations abandoned mid-payment self-heal
/// without a cleanup job.
#[async_trait]
pub trait SoftLockStore: Send + Sync + std::fmt::Debug {
    /// Returns the number of units currently soft-locked for a tier.
    /// A missing counter reads as zero.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::SoftLockUnavailable`] when the store
    /// cannot be reached.
    async fn locked_count(&self, tier_id: TierId) -> Result<i64, BoxofficeError>;

    /// Atomically adds `quantity` units to a tier's counter and refreshes
    /// its TTL.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::SoftLockUnavailable`] when the store
    /// cannot be reached.
    async fn acquire(&self, tier_id: TierId, quantity: i64) -> Result<(), BoxofficeError>;

    /// Removes `quantity` units from a tier's counter, clamping at zero.
    ///
    /// Release after the counter already expired is a no-op apart from a
    /// warning; the counter never goes negative.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::SoftLockUnavailable`] when the store
    /// cannot be reached.
    async fn release(&self, tier_id: TierId, quantity: i64) -> Result<(), BoxofficeError>;
}

/// Cache of responses already produced for an (user, idempotency key)
/// pair.
#[async_trait]
pub trait IdempotencyStore: Send + Sync + std::fmt::Debug {
    /// Looks up a previously stored response for this user and key.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::Internal`] when the cache cannot be
    /// reached or holds an unreadable entry.
    async fn get(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<StoredResponse>, BoxofficeError>;

    /// Stores a response for this user and key with the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`BoxofficeError::Internal`] when the cache cannot be
    /// reached.
    async fn put(
        &self,
        user_id: UserId,
        key: &str,
        response: &StoredResponse,
    ) -> Result<(), BoxofficeError>;
}

/// Redis key for a tier's soft lock counter.
#[must_use]
pub(crate) fn lock_key(tier_id: TierId) -> String {
    format!("locks:tier:{tier_id}")
}

/// Redis key for a cached idempotent response, scoped by user to prevent
/// cross-user replay.
#[must_use]
pub(crate) fn idempotency_key(user_id: UserId, key: &str) -> String {
    format!("idempotency:{user_id}:{key}")
}
