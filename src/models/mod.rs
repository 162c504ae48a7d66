//! Core data models for the organization name registry.
//!
//! These entities represent owners, the organization names they hold and the
//! clouds each name is claimed in. They map cleanly to database tables via
//! `sqlx::FromRow` and serialize naturally as JSON via `serde`.

pub mod cloud;
pub mod owner;
pub mod reservation;
