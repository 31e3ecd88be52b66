//! Idempotent replay of the booking initiation endpoint.
//!
//! Retries of `POST /bookings` must not reserve inventory twice. Callers
//! send a mandatory `Idempotency-Key` header; the first successful
//! response under that key is cached and replayed verbatim for every
//! retry. Entries are scoped by user, so one buyer's key can never
//! surface another buyer's response.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

use crate::cache::{IdempotencyStore, StoredResponse};
use crate::domain::UserId;
use crate::error::BoxofficeError;

/// Header carrying the caller-chosen idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Extractor for the mandatory `Idempotency-Key` header.
#[derive(Debug, Clone)]
pub struct IdempotencyKey(pub String);

impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = BoxofficeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                BoxofficeError::InvalidRequest("Idempotency-Key header is required".to_string())
            })?;
        Ok(Self(key.to_string()))
    }
}

/// Replay gate over the [`IdempotencyStore`].
///
/// The cache is advisory: a lookup failure counts as a miss and a write
/// failure is only logged. A degraded cache costs duplicate work, never
/// availability.
#[derive(Debug, Clone)]
pub struct IdempotencyGate {
    store: Arc<dyn IdempotencyStore>,
}

impl IdempotencyGate {
    /// Creates a gate over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn IdempotencyStore>) -> Self {
        Self { store }
    }

    /// Returns the cached response for this user and key, if any.
    pub async fn lookup(&self, user_id: UserId, key: &str) -> Option<StoredResponse> {
        match self.store.get(user_id, key).await {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(%user_id, key, %error, "idempotency lookup failed, treating as miss");
                None
            }
        }
    }

    /// Caches a response under this user and key.
    ///
    /// Only success responses are cached, so a retry after a failure gets
    /// a fresh attempt instead of the failure replayed.
    pub async fn record(
        &self,
        user_id: UserId,
        key: &str,
        status: StatusCode,
        body: &serde_json::Value,
    ) {
        if !status.is_success() {
            return;
        }
        let stored = StoredResponse {
            status: status.as_u16(),
            body: body.clone(),
        };
        if let Err(error) = self.store.put(user_id, key, &stored).await {
            tracing::warn!(%user_id, key, %error, "failed to cache idempotent response");
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::cache::InMemoryIdempotencyStore;

    fn make_gate() -> IdempotencyGate {
        IdempotencyGate::new(Arc::new(InMemoryIdempotencyStore::new()))
    }

    fn user() -> UserId {
        UserId::from_uuid(uuid::Uuid::new_v4())
    }

    #[tokio::test]
    async fn extractor_requires_nonempty_key() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, ()) = request.into_parts();
        let missing = IdempotencyKey::from_request_parts(&mut parts, &()).await;
        assert!(matches!(missing, Err(BoxofficeError::InvalidRequest(_))));

        let request = Request::builder()
            .header(IDEMPOTENCY_KEY_HEADER, "   ")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let blank = IdempotencyKey::from_request_parts(&mut parts, &()).await;
        assert!(matches!(blank, Err(BoxofficeError::InvalidRequest(_))));

        let request = Request::builder()
            .header(IDEMPOTENCY_KEY_HEADER, "retry-001")
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let Ok(IdempotencyKey(key)) = IdempotencyKey::from_request_parts(&mut parts, &()).await
        else {
            panic!("extraction failed");
        };
        assert_eq!(key, "retry-001");
    }

    #[tokio::test]
    async fn records_and_replays_success_responses() {
        let gate = make_gate();
        let user_id = user();
        let body = serde_json::json!({"booking_id": "b-1"});

        assert!(gate.lookup(user_id, "key-1").await.is_none());

        gate.record(user_id, "key-1", StatusCode::CREATED, &body).await;
        let Some(stored) = gate.lookup(user_id, "key-1").await else {
            panic!("expected a cached response");
        };
        assert_eq!(stored.status, 201);
        assert_eq!(stored.body, body);
    }

    #[tokio::test]
    async fn does_not_cache_error_responses() {
        let gate = make_gate();
        let user_id = user();
        let body = serde_json::json!({"error": {"code": 4001}});

        gate.record(user_id, "key-1", StatusCode::CONFLICT, &body).await;
        assert!(gate.lookup(user_id, "key-1").await.is_none());
    }

    #[tokio::test]
    async fn entries_are_scoped_by_user() {
        let gate = make_gate();
        let body = serde_json::json!({"booking_id": "b-1"});

        let alice = user();
        gate.record(alice, "shared-key", StatusCode::CREATED, &body).await;

        assert!(gate.lookup(user(), "shared-key").await.is_none());
        assert!(gate.lookup(alice, "shared-key").await.is_some());
    }
}
