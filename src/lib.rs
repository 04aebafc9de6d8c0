//! Booking conflict checks and calendar projection for rental cars.
//!
//! The pure pieces (validation, status, day/month projection, pricing) live in
//! [`engine`] and operate on `&[Reservation]` snapshots. [`engine::Engine`]
//! wraps them in a WAL-backed reservation store.

pub mod clock;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod wal;
