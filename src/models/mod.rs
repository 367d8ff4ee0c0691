//! Core data models for the inventory service.
//!
//! `Item` maps to a row of the `inventory` table via `sqlx::FromRow` and to an
//! element of the JSON document via `serde`.

pub mod item;
