pub mod health_handlers;
pub mod mapping_handlers;
pub mod reservation_handlers;
