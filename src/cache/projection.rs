// src/cache/projection.rs

use serde::{Deserialize, Serialize};

use crate::models::{
    question::QuestionWithAnswers,
    quiz::QuizAggregate,
};

/// Cache-friendly snapshot of a quiz aggregate.
///
/// Derived data: never authoritative, always reconstructible from the store,
/// safe to discard at any time. Field names are camelCase on the wire so the
/// stored JSON matches what external cache inspectors expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizProjection {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub questions: Vec<QuestionProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionProjection {
    pub id: i64,
    pub text: String,
    pub media_url: Option<String>,
    pub time_to_answer: Option<i32>,
    pub answers: Vec<AnswerProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerProjection {
    pub id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// Lightweight summary used by the quiz listing cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub question_count: usize,
}

impl From<&QuizAggregate> for QuizProjection {
    fn from(aggregate: &QuizAggregate) -> Self {
        Self {
            id: aggregate.quiz.id,
            name: aggregate.quiz.name.clone(),
            status: aggregate.quiz.status.clone(),
            questions: aggregate.questions.iter().map(Into::into).collect(),
        }
    }
}

impl From<&QuestionWithAnswers> for QuestionProjection {
    fn from(question: &QuestionWithAnswers) -> Self {
        Self {
            id: question.question.id,
            text: question.question.text.clone(),
            media_url: question.question.media_url.clone(),
            time_to_answer: question.question.time_to_answer,
            answers: question
                .answers
                .iter()
                .map(|answer| AnswerProjection {
                    id: answer.id,
                    text: answer.text.clone(),
                    is_correct: answer.is_correct,
                })
                .collect(),
        }
    }
}

impl From<&QuizAggregate> for QuizSummary {
    fn from(aggregate: &QuizAggregate) -> Self {
        Self {
            id: aggregate.quiz.id,
            name: aggregate.quiz.name.clone(),
            status: aggregate.quiz.status.clone(),
            question_count: aggregate.questions.len(),
        }
    }
}
