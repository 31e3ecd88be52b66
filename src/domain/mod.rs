//! Domain layer: identifiers, catalog and order records, booking events,
//! and payment signature verification.
//!
//! This module contains the server-side domain model: the typed identifier
//! families, the catalog (events and ticket tiers), the order trail a
//! booking leaves behind, the event bus for broadcasting booking
//! transitions, and the HMAC verifier guarding the two payment trust paths.

pub mod booking_event;
pub mod catalog;
pub mod event_bus;
pub mod ids;
pub mod order;
pub mod signature;
pub mod slug;

pub use booking_event::{BookingEvent, ConfirmationSource};
pub use catalog::{Event, EventStatus, NewEvent, NewTicketTier, TicketTier};
pub use event_bus::EventBus;
pub use ids::{EventId, OrderId, TierId, UserId};
pub use order::{
    BookingItem, BookingSummary, EventRegistration, FinalizedOrder, Order, OrderItem, OrderStatus,
    ReservationLine, ReservedOrder,
};
pub use signature::SignatureVerifier;
pub use slug::slug_from_title;
