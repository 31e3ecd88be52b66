//! Data Transfer Objects for REST request/response serialization.
//!
//! Monetary amounts are serialized as JSON strings (rust_decimal's
//! default) to prevent precision loss in clients.

pub mod booking_dto;
pub mod catalog_dto;
pub mod common_dto;

pub use booking_dto::*;
pub use catalog_dto::*;
pub use common_dto::*;
