// src/store.rs

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::models::{
    question::{Answer, CreateQuestionRequest, Question, QuestionWithAnswers, UpdateQuestionRequest},
    quiz::{CreateQuizRequest, Quiz, QuizAggregate, STATUS_DRAFT, UpdateQuizRequest},
};

/// Read side of the aggregate store. The cache layer depends on this trait
/// only, so tests can run it against an in-memory double.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Loads a quiz with its questions (ordered by position) and answers.
    async fn find_by_id(&self, id: i64) -> Result<Option<QuizAggregate>, sqlx::Error>;

    /// Loads every quiz aggregate, ordered by id.
    async fn find_all(&self) -> Result<Vec<QuizAggregate>, sqlx::Error>;
}

/// Write side used by the HTTP handlers. Each mutation returns the refreshed
/// aggregate so the write coordinator can feed it into the cache transition.
#[async_trait]
pub trait QuizWriteStore: QuizStore {
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<QuizAggregate, sqlx::Error>;

    async fn update_quiz(
        &self,
        id: i64,
        req: &UpdateQuizRequest,
    ) -> Result<Option<QuizAggregate>, sqlx::Error>;

    /// Deletes a quiz; returns false when no row was deleted (already gone).
    async fn delete_quiz(&self, id: i64) -> Result<bool, sqlx::Error>;

    /// Adds a question (with answers) to a quiz. Returns the new question id
    /// and the refreshed aggregate, or None when the quiz does not exist.
    async fn add_question(
        &self,
        quiz_id: i64,
        req: &CreateQuestionRequest,
    ) -> Result<Option<(i64, QuizAggregate)>, sqlx::Error>;

    /// Updates a question; when answers are supplied they replace the
    /// existing set. Returns the owning quiz's refreshed aggregate.
    async fn update_question(
        &self,
        question_id: i64,
        req: &UpdateQuestionRequest,
    ) -> Result<Option<QuizAggregate>, sqlx::Error>;

    /// Deletes a question (answers cascade). Returns the owning quiz's
    /// refreshed aggregate, or None when the question does not exist.
    async fn delete_question(
        &self,
        question_id: i64,
    ) -> Result<Option<QuizAggregate>, sqlx::Error>;
}

/// Postgres-backed aggregate store. Cascades in the schema keep the store
/// fully consistent before any cache transition runs.
#[derive(Clone)]
pub struct PgQuizStore {
    pool: PgPool,
}

impl PgQuizStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizStore for PgQuizStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<QuizAggregate>, sqlx::Error> {
        let quiz = sqlx::query_as::<_, Quiz>(
            "SELECT id, name, status, created_at, updated_at FROM quizzes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(quiz) = quiz else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, quiz_id, text, "position", time_to_answer, media_url
            FROM questions
            WHERE quiz_id = $1
            ORDER BY "position"
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let answers = sqlx::query_as::<_, Answer>(
            r#"
            SELECT id, question_id, text, is_correct
            FROM answers
            WHERE question_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&question_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(QuizAggregate {
            quiz,
            questions: group_answers(questions, answers),
        }))
    }

    async fn find_all(&self) -> Result<Vec<QuizAggregate>, sqlx::Error> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            "SELECT id, name, status, created_at, updated_at FROM quizzes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, quiz_id, text, "position", time_to_answer, media_url
            FROM questions
            ORDER BY quiz_id, "position"
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let answers = sqlx::query_as::<_, Answer>(
            "SELECT id, question_id, text, is_correct FROM answers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut answers_by_question: HashMap<i64, Vec<Answer>> = HashMap::new();
        for answer in answers {
            answers_by_question
                .entry(answer.question_id)
                .or_default()
                .push(answer);
        }

        let mut questions_by_quiz: HashMap<i64, Vec<QuestionWithAnswers>> = HashMap::new();
        for question in questions {
            let answers = answers_by_question.remove(&question.id).unwrap_or_default();
            questions_by_quiz
                .entry(question.quiz_id)
                .or_default()
                .push(QuestionWithAnswers { question, answers });
        }

        Ok(quizzes
            .into_iter()
            .map(|quiz| {
                let questions = questions_by_quiz.remove(&quiz.id).unwrap_or_default();
                QuizAggregate { quiz, questions }
            })
            .collect())
    }
}

#[async_trait]
impl QuizWriteStore for PgQuizStore {
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<QuizAggregate, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let status = req.status.as_deref().unwrap_or(STATUS_DRAFT);
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (name, status)
            VALUES ($1, $2)
            RETURNING id, name, status, created_at, updated_at
            "#,
        )
        .bind(&req.name)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        for (index, question) in req.questions.iter().enumerate() {
            let position = question.position.unwrap_or(index as i32 + 1);
            insert_question(&mut tx, quiz.id, question, position).await?;
        }

        tx.commit().await?;

        // Freshly inserted, so the reload cannot miss.
        self.find_by_id(quiz.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn update_quiz(
        &self,
        id: i64,
        req: &UpdateQuizRequest,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        let updated = sqlx::query(
            r#"
            UPDATE quizzes
            SET name = COALESCE($2, name),
                status = COALESCE($3, status),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.name.as_deref())
        .bind(req.status.as_deref())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, sqlx::Error> {
        let deleted = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn add_question(
        &self,
        quiz_id: i64,
        req: &CreateQuestionRequest,
    ) -> Result<Option<(i64, QuizAggregate)>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1")
            .bind(quiz_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let position = match req.position {
            Some(position) => position,
            None => {
                sqlx::query_scalar::<_, i32>(
                    r#"SELECT COALESCE(MAX("position"), 0) + 1 FROM questions WHERE quiz_id = $1"#,
                )
                .bind(quiz_id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let question_id = insert_question(&mut tx, quiz_id, req, position).await?;
        tx.commit().await?;

        let aggregate = self
            .find_by_id(quiz_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        Ok(Some((question_id, aggregate)))
    }

    async fn update_question(
        &self,
        question_id: i64,
        req: &UpdateQuestionRequest,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let quiz_id = sqlx::query_scalar::<_, i64>("SELECT quiz_id FROM questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(quiz_id) = quiz_id else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE questions
            SET text = COALESCE($2, text),
                "position" = COALESCE($3, "position"),
                time_to_answer = COALESCE($4, time_to_answer),
                media_url = COALESCE($5, media_url)
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .bind(req.text.as_deref())
        .bind(req.position)
        .bind(req.time_to_answer)
        .bind(req.media_url.as_deref())
        .execute(&mut *tx)
        .await?;

        if let Some(answers) = &req.answers {
            sqlx::query("DELETE FROM answers WHERE question_id = $1")
                .bind(question_id)
                .execute(&mut *tx)
                .await?;

            for answer in answers {
                sqlx::query(
                    "INSERT INTO answers (question_id, text, is_correct) VALUES ($1, $2, $3)",
                )
                .bind(question_id)
                .bind(&answer.text)
                .bind(answer.is_correct)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.find_by_id(quiz_id).await
    }

    async fn delete_question(
        &self,
        question_id: i64,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        let quiz_id = sqlx::query_scalar::<_, i64>(
            "DELETE FROM questions WHERE id = $1 RETURNING quiz_id",
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        match quiz_id {
            Some(quiz_id) => self.find_by_id(quiz_id).await,
            None => Ok(None),
        }
    }
}

async fn insert_question(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    quiz_id: i64,
    req: &CreateQuestionRequest,
    position: i32,
) -> Result<i64, sqlx::Error> {
    let question_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO questions (quiz_id, text, "position", time_to_answer, media_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(&req.text)
    .bind(position)
    .bind(req.time_to_answer)
    .bind(req.media_url.as_deref())
    .fetch_one(&mut **tx)
    .await?;

    for answer in &req.answers {
        sqlx::query("INSERT INTO answers (question_id, text, is_correct) VALUES ($1, $2, $3)")
            .bind(question_id)
            .bind(&answer.text)
            .bind(answer.is_correct)
            .execute(&mut **tx)
            .await?;
    }

    Ok(question_id)
}

fn group_answers(questions: Vec<Question>, answers: Vec<Answer>) -> Vec<QuestionWithAnswers> {
    let mut answers_by_question: HashMap<i64, Vec<Answer>> = HashMap::new();
    for answer in answers {
        answers_by_question
            .entry(answer.question_id)
            .or_default()
            .push(answer);
    }

    questions
        .into_iter()
        .map(|question| {
            let answers = answers_by_question.remove(&question.id).unwrap_or_default();
            QuestionWithAnswers { question, answers }
        })
        .collect()
}
