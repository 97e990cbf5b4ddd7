// src/lib.rs

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

// Re-export specific items for convenience if needed
pub use routes::create_router;
