pub mod auth;
pub mod mood;
pub mod orders;
pub mod products;
