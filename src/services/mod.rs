//! Storage backends, the photo store and the inventory operations built on them.

pub mod inventory_service;
pub mod json_store;
pub mod photo_store;
pub mod repository;
pub mod sqlite_store;
