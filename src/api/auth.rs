//! Caller identity extraction.
//!
//! Authentication itself happens upstream; this service trusts the
//! `x-user-id` header the identity layer forwards after validating the
//! caller's session. Handlers opt in by taking an [`AuthenticatedUser`]
//! parameter.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::UserId;
use crate::error::BoxofficeError;

/// Header carrying the authenticated caller's user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated caller.
///
/// Requests without a parseable UUID in the [`USER_ID_HEADER`] header are
/// rejected with 401 before the handler runs.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = BoxofficeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(BoxofficeError::Unauthenticated)?;
        let uuid = uuid::Uuid::parse_str(raw).map_err(|_| BoxofficeError::Unauthenticated)?;
        Ok(Self(UserId::from_uuid(uuid)))
    }
}
