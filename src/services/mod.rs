pub mod admin_service;
pub mod auth_service;
pub mod mood_service;
pub mod order_service;
pub mod product_service;
