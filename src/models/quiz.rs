// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, QuestionWithAnswers};

/// Quiz lifecycle states stored in the `status` column.
pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_OFF: &str = "off";

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub name: String,

    /// One of 'draft', 'active' or 'off'.
    pub status: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A quiz together with its ordered questions and their answers.
///
/// This is the unit the store loads and the cache layer projects; questions
/// are ordered by their display position.
#[derive(Debug, Clone)]
pub struct QuizAggregate {
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithAnswers>,
}

impl QuizAggregate {
    pub fn id(&self) -> i64 {
        self.quiz.id
    }
}

/// DTO for creating a new quiz, optionally with nested questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(custom(function = validate_status))]
    pub status: Option<String>,

    #[validate(nested)]
    #[serde(default)]
    pub questions: Vec<CreateQuestionRequest>,
}

/// DTO for updating a quiz. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
}

/// DTO for the delete endpoint: a hard delete removes the row (and its
/// questions/answers via cascade), the default soft delete flips the quiz
/// to 'off'.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuizRequest {
    #[serde(default)]
    pub hard: bool,
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        STATUS_DRAFT | STATUS_ACTIVE | STATUS_OFF => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_status")),
    }
}
