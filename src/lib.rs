//! # boxoffice
//!
//! Ticket inventory reservation and payment reconciliation service for an
//! events platform.
//!
//! Bookings move through a two-phase flow: initiation reserves inventory
//! and opens a payment order at the upstream gateway, then one of two
//! trusted payment signals (a signed webhook or a signed client
//! verification) finalizes the pending order. Inventory truth lives in
//! PostgreSQL; Redis carries the expiring soft lock counters that keep
//! concurrent buyers from racing past the availability pre-check, plus
//! the idempotency cache absorbing client retries.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)                 Payment Gateway
//!     │                               │
//!     ├── REST Handlers (api/) ◄── Webhook
//!     │
//!     ├── BookingService / CatalogService (service/)
//!     ├── EventBus + SignatureVerifier (domain/)
//!     │
//!     ├── BookingStore: PostgreSQL (persistence/)
//!     ├── SoftLockStore + IdempotencyStore: Redis (cache/)
//!     └── PaymentGateway client (gateway/)
//! ```

pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod service;
