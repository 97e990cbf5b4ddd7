// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    cache::QuizProjection,
    coordinator::{EntityEvent, WriteCoordinator},
    error::AppError,
    handlers::quiz::map_constraint_error,
    models::question::{CreateQuestionRequest, UpdateQuestionRequest},
    state::AppState,
    store::QuizWriteStore,
};

/// Lists a quiz's questions from its cached projection, with a total count.
pub async fn get_quiz_questions(
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .cache
        .get_quiz(quiz_id, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;

    let total = quiz.questions.len();
    Ok(Json(serde_json::json!({
        "quiz_id": quiz_id,
        "questions": quiz.questions,
        "total": total,
    })))
}

/// Adds a question (with answers) to a quiz and refreshes the owning quiz's
/// cache entry through the coordinator.
pub async fn add_question(
    State(state): State<AppState>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let (question_id, aggregate) = state
        .store
        .add_question(quiz_id, &payload)
        .await
        .map_err(map_constraint_error)?
        .ok_or_else(|| AppError::NotFound(format!("Quiz {} not found", quiz_id)))?;

    let mut coordinator = WriteCoordinator::new(state.cache.clone());
    coordinator.entity_persisted(EntityEvent::Question {
        question_id,
        quiz: aggregate.clone(),
    });
    coordinator.unit_of_work_committed().await;

    Ok((StatusCode::CREATED, Json(QuizProjection::from(&aggregate))))
}

/// Updates a question; supplied answers replace the existing set.
pub async fn update_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let aggregate = state
        .store
        .update_question(question_id, &payload)
        .await
        .map_err(map_constraint_error)?
        .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;

    let mut coordinator = WriteCoordinator::new(state.cache.clone());
    coordinator.entity_updated(EntityEvent::Question {
        question_id,
        quiz: aggregate.clone(),
    });
    coordinator.unit_of_work_committed().await;

    Ok(Json(QuizProjection::from(&aggregate)))
}

/// Deletes a question (answers cascade) and refreshes the owning quiz.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let aggregate = state
        .store
        .delete_question(question_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;

    let mut coordinator = WriteCoordinator::new(state.cache.clone());
    coordinator.entity_removed(EntityEvent::Question {
        question_id,
        quiz: aggregate,
    });
    coordinator.unit_of_work_committed().await;

    Ok(StatusCode::NO_CONTENT)
}
