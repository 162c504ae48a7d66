pub mod reservation_service;
pub mod validation;
