pub mod health_handlers;
pub mod inventory_handlers;
pub mod search_handlers;
