// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// The question text shown to players.
    pub text: String,

    /// Display position, unique per quiz, defines question order.
    pub position: i32,

    /// Optional time limit for answering, in seconds.
    pub time_to_answer: Option<i32>,

    pub media_url: Option<String>,
}

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// A question together with its answers.
#[derive(Debug, Clone)]
pub struct QuestionWithAnswers {
    pub question: Question,
    pub answers: Vec<Answer>,
}

/// DTO for creating a question with its answers.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 5, max = 255))]
    pub text: String,

    /// Defaults to the next free position in the quiz.
    pub position: Option<i32>,

    #[validate(range(min = 1))]
    pub time_to_answer: Option<i32>,

    #[validate(length(max = 500))]
    pub media_url: Option<String>,

    #[validate(nested)]
    #[serde(default)]
    pub answers: Vec<CreateAnswerRequest>,
}

/// DTO for updating a question. When `answers` is present the question's
/// answers are replaced wholesale.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 5, max = 255))]
    pub text: Option<String>,

    pub position: Option<i32>,

    #[validate(range(min = 1))]
    pub time_to_answer: Option<i32>,

    #[validate(length(max = 500))]
    pub media_url: Option<String>,

    #[validate(nested)]
    pub answers: Option<Vec<CreateAnswerRequest>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnswerRequest {
    #[validate(length(min = 1, max = 255))]
    pub text: String,

    #[serde(default)]
    pub is_correct: bool,
}
