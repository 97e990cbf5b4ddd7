// src/handlers/cache_admin.rs

use axum::{Json, body::Bytes, extract::State, response::IntoResponse};
use serde::Deserialize;

use crate::{error::AppError, state::AppState};

/// Cache statistics for monitoring.
pub async fn cache_stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = state.cache.get_stats().await?;
    Ok(Json(stats))
}

/// Pre-loads every quiz and the listing into the cache.
pub async fn warmup_cache(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let count = state.cache.warmup_cache().await?;

    Ok(Json(serde_json::json!({
        "message": "Cache warmed up successfully",
        "count": count,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearCacheRequest {
    pub quiz_id: Option<i64>,
}

/// Clears the cache: a specific quiz entry when `quiz_id` is given,
/// otherwise every quiz entry plus the listing entry.
pub async fn clear_cache(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<ClearCacheRequest>(&body)
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .quiz_id
    };

    match quiz_id {
        Some(id) => {
            state.cache.invalidate_quiz_cache(id).await?;
            Ok(Json(serde_json::json!({
                "message": format!("Cache cleared for quiz {}", id),
            })))
        }
        None => {
            state.cache.clear_all_caches().await?;
            Ok(Json(serde_json::json!({
                "message": "All quiz caches cleared",
            })))
        }
    }
}
