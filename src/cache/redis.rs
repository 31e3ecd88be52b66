//! Redis-backed soft lock counters and idempotency cache.
//!
//! Both stores share a [`ConnectionManager`], which multiplexes one
//! connection and reconnects automatically. Lock acquisition goes through
//! a `MULTI`/`EXEC` pipeline so the counter bump and its TTL refresh land
//! together; lock release runs a Lua script so the decrement and the
//! zero clamp are one atomic step.

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{IdempotencyStore, SoftLockStore, StoredResponse, idempotency_key, lock_key};
use crate::domain::{TierId, UserId};
use crate::error::BoxofficeError;

/// Opens a Redis connection manager for the given URL.
///
/// # Errors
///
/// Returns [`BoxofficeError::SoftLockUnavailable`] when the URL is invalid
/// or the initial connection fails.
pub async fn connect(redis_url: &str) -> Result<ConnectionManager, BoxofficeError> {
    let client = Client::open(redis_url).map_err(|e| {
        BoxofficeError::SoftLockUnavailable(format!("failed to create redis client: {e}"))
    })?;
    ConnectionManager::new(client).await.map_err(|e| {
        BoxofficeError::SoftLockUnavailable(format!("failed to connect to redis: {e}"))
    })
}

/// Redis-backed [`SoftLockStore`].
///
/// Counters live under `locks:tier:{tier_id}`. Every acquisition refreshes
/// the key's TTL, so the counter survives as long as reservations keep
/// arriving and expires once they stop. Release deletes the key once the
/// counter reaches zero, so an idle tier holds no key at all.
#[derive(Clone)]
pub struct RedisSoftLockStore {
    conn: ConnectionManager,
    ttl_secs: i64,
}

/// Decrements a lock counter and deletes the key at zero or below.
///
/// `DECRBY` on a missing key creates it, so a release that raced the TTL
/// would otherwise strand a negative, TTL-less counter. Running the
/// decrement and the cleanup server-side keeps concurrent releases from
/// interleaving between the two steps.
const RELEASE_SCRIPT: &str = r"
local v = redis.call('DECRBY', KEYS[1], ARGV[1])
if v <= 0 then
    redis.call('DEL', KEYS[1])
end
return v
";

impl RedisSoftLockStore {
    /// Creates a store over an established connection manager.
    #[must_use]
    pub fn new(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            conn,
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Debug for RedisSoftLockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSoftLockStore")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SoftLockStore for RedisSoftLockStore {
    async fn locked_count(&self, tier_id: TierId) -> Result<i64, BoxofficeError> {
        let mut conn = self.conn.clone();
        let count: Option<i64> = conn.get(lock_key(tier_id)).await.map_err(|e| {
            BoxofficeError::SoftLockUnavailable(format!("failed to read lock counter: {e}"))
        })?;
        Ok(count.unwrap_or(0))
    }

    async fn acquire(&self, tier_id: TierId, quantity: i64) -> Result<(), BoxofficeError> {
        let mut conn = self.conn.clone();
        let key = lock_key(tier_id);

        let _: () = redis::pipe()
            .atomic()
            .incr(&key, quantity)
            .ignore()
            .expire(&key, self.ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                BoxofficeError::SoftLockUnavailable(format!("failed to acquire soft lock: {e}"))
            })?;

        tracing::debug!(%tier_id, quantity, ttl_secs = self.ttl_secs, "acquired soft lock");
        Ok(())
    }

    async fn release(&self, tier_id: TierId, quantity: i64) -> Result<(), BoxofficeError> {
        let mut conn = self.conn.clone();
        let key = lock_key(tier_id);

        let remaining: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(quantity)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                BoxofficeError::SoftLockUnavailable(format!("failed to release soft lock: {e}"))
            })?;

        // A release can arrive after the counter expired (TTL landed mid
        // payment). The script has already clamped the counter; only the
        // anomaly is left to report.
        if remaining < 0 {
            tracing::warn!(
                %tier_id,
                remaining,
                "soft lock released below zero; counter clamped"
            );
        }

        tracing::debug!(%tier_id, quantity, "released soft lock");
        Ok(())
    }
}

/// Redis-backed [`IdempotencyStore`].
///
/// Entries live under `idempotency:{user_id}:{key}` and expire after the
/// configured TTL (24 hours by default).
#[derive(Clone)]
pub struct RedisIdempotencyStore {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisIdempotencyStore {
    /// Creates a store over an established connection manager.
    #[must_use]
    pub fn new(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }
}

impl fmt::Debug for RedisIdempotencyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisIdempotencyStore")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    async fn get(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Option<StoredResponse>, BoxofficeError> {
        let mut conn = self.conn.clone();
        let cache_key = idempotency_key(user_id, key);

        let cached: Option<String> = conn.get(&cache_key).await.map_err(|e| {
            BoxofficeError::Internal(format!("idempotency cache read failed: {e}"))
        })?;

        match cached {
            Some(json) => {
                let response = serde_json::from_str(&json).map_err(|e| {
                    BoxofficeError::Internal(format!("idempotency cache entry unreadable: {e}"))
                })?;
                Ok(Some(response))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        user_id: UserId,
        key: &str,
        response: &StoredResponse,
    ) -> Result<(), BoxofficeError> {
        let mut conn = self.conn.clone();
        let cache_key = idempotency_key(user_id, key);
        let json = serde_json::to_string(response).map_err(|e| {
            BoxofficeError::Internal(format!("idempotency cache entry unserializable: {e}"))
        })?;

        let _: () = conn
            .set_ex(&cache_key, json, self.ttl_secs)
            .await
            .map_err(|e| BoxofficeError::Internal(format!("idempotency cache write failed: {e}")))?;

        Ok(())
    }
}
