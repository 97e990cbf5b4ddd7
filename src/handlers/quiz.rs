// src/handlers/quiz.rs

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    cache::QuizProjection,
    coordinator::{EntityEvent, WriteCoordinator},
    error::AppError,
    models::quiz::{CreateQuizRequest, DeleteQuizRequest, STATUS_OFF, UpdateQuizRequest},
    state::AppState,
    store::{QuizStore, QuizWriteStore},
};

/// Lists all quizzes as lightweight summaries, served cache-aside.
pub async fn list_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summaries = state.cache.get_all_quizzes(true).await?;
    Ok(Json(summaries))
}

/// Retrieves a single quiz projection by ID, served cache-aside.
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .cache
        .get_quiz(id, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", id)))?;

    Ok(Json(quiz))
}

/// Creates a quiz (optionally with nested questions), then drives the write
/// coordinator through the persist transition for this unit of work.
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let aggregate = state
        .store
        .create_quiz(&payload)
        .await
        .map_err(map_constraint_error)?;

    let mut coordinator = WriteCoordinator::new(state.cache.clone());
    coordinator.entity_persisted(EntityEvent::Quiz(aggregate.clone()));
    coordinator.unit_of_work_committed().await;

    Ok((StatusCode::CREATED, Json(QuizProjection::from(&aggregate))))
}

/// Updates a quiz's own fields. Listing caches are left to their TTL.
pub async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let aggregate = state
        .store
        .update_quiz(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", id)))?;

    let mut coordinator = WriteCoordinator::new(state.cache.clone());
    coordinator.entity_updated(EntityEvent::Quiz(aggregate.clone()));
    coordinator.unit_of_work_committed().await;

    Ok(Json(QuizProjection::from(&aggregate)))
}

/// Deletes a quiz. The default is a soft delete (status flipped to 'off',
/// cache refreshed); `{"hard": true}` removes the row and its children via
/// cascade, then runs the remove transition.
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // An empty body means a plain soft delete.
    let hard = if body.is_empty() {
        false
    } else {
        serde_json::from_slice::<DeleteQuizRequest>(&body)
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .hard
    };

    let aggregate = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", id)))?;

    let mut coordinator = WriteCoordinator::new(state.cache.clone());

    if hard {
        // The quiz may have been deleted between the lookup above and here.
        let deleted = state.store.delete_quiz(id).await?;
        if !deleted {
            return Err(AppError::NotFound(format!("Quiz {} not found", id)));
        }
        coordinator.entity_removed(EntityEvent::Quiz(aggregate));
    } else {
        let softened = state
            .store
            .update_quiz(
                id,
                &UpdateQuizRequest {
                    name: None,
                    status: Some(STATUS_OFF.to_string()),
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", id)))?;
        coordinator.entity_updated(EntityEvent::Quiz(softened));
    }

    coordinator.unit_of_work_committed().await;

    Ok(StatusCode::NO_CONTENT)
}

/// Maps unique-constraint violations (duplicate question position) to 409.
pub(crate) fn map_constraint_error(err: sqlx::Error) -> AppError {
    let msg = err.to_string();
    if msg.contains("unique constraint") || msg.contains("23505") {
        AppError::Conflict("Question position already taken in this quiz".to_string())
    } else {
        tracing::error!("Database write failed: {:?}", err);
        AppError::InternalServerError(msg)
    }
}
