// src/cache/mod.rs

pub mod backend;
pub mod keys;
pub mod projection;
pub mod service;

pub use backend::{CacheBackend, Computed, MemoryCache};
pub use projection::{QuizProjection, QuizSummary};
pub use service::QuizCacheService;

/// Cache-layer errors.
///
/// Store errors flow through here when a cache miss falls back to the
/// database inside a compute step.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}
