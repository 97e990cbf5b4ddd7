// tests/api_tests.rs
//
// Router-level tests: the full axum app driven through tower's oneshot,
// backed by an in-memory store double instead of Postgres.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};
use tower::ServiceExt;

use quiz_api::{
    cache::{MemoryCache, QuizCacheService},
    config::Config,
    models::{
        question::{Answer, CreateQuestionRequest, Question, QuestionWithAnswers, UpdateQuestionRequest},
        quiz::{CreateQuizRequest, Quiz, QuizAggregate, STATUS_DRAFT, UpdateQuizRequest},
    },
    routes::create_router,
    state::AppState,
    store::{QuizStore, QuizWriteStore},
};

// ---------------------------------------------------------------------------
// Store doubles
// ---------------------------------------------------------------------------

struct InMemoryStore {
    quizzes: Mutex<BTreeMap<i64, QuizAggregate>>,
    next_quiz_id: AtomicI64,
    next_question_id: AtomicI64,
}

impl InMemoryStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            quizzes: Mutex::new(BTreeMap::new()),
            next_quiz_id: AtomicI64::new(1),
            next_question_id: AtomicI64::new(1),
        })
    }

    fn build_question(
        &self,
        quiz_id: i64,
        req: &CreateQuestionRequest,
        position: i32,
    ) -> QuestionWithAnswers {
        let question_id = self.next_question_id.fetch_add(1, Ordering::SeqCst);
        QuestionWithAnswers {
            question: Question {
                id: question_id,
                quiz_id,
                text: req.text.clone(),
                position,
                time_to_answer: req.time_to_answer,
                media_url: req.media_url.clone(),
            },
            answers: req
                .answers
                .iter()
                .enumerate()
                .map(|(index, answer)| Answer {
                    id: question_id * 100 + index as i64 + 1,
                    question_id,
                    text: answer.text.clone(),
                    is_correct: answer.is_correct,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl QuizStore for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<QuizAggregate>, sqlx::Error> {
        Ok(self.quizzes.lock().unwrap().get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<QuizAggregate>, sqlx::Error> {
        Ok(self.quizzes.lock().unwrap().values().cloned().collect())
    }
}

#[async_trait]
impl QuizWriteStore for InMemoryStore {
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<QuizAggregate, sqlx::Error> {
        let id = self.next_quiz_id.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now();

        let questions = req
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let position = question.position.unwrap_or(index as i32 + 1);
                self.build_question(id, question, position)
            })
            .collect();

        let aggregate = QuizAggregate {
            quiz: Quiz {
                id,
                name: req.name.clone(),
                status: req
                    .status
                    .clone()
                    .unwrap_or_else(|| STATUS_DRAFT.to_string()),
                created_at: now,
                updated_at: now,
            },
            questions,
        };

        self.quizzes.lock().unwrap().insert(id, aggregate.clone());
        Ok(aggregate)
    }

    async fn update_quiz(
        &self,
        id: i64,
        req: &UpdateQuizRequest,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        let mut quizzes = self.quizzes.lock().unwrap();
        let Some(aggregate) = quizzes.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &req.name {
            aggregate.quiz.name = name.clone();
        }
        if let Some(status) = &req.status {
            aggregate.quiz.status = status.clone();
        }
        aggregate.quiz.updated_at = chrono::Utc::now();

        Ok(Some(aggregate.clone()))
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, sqlx::Error> {
        Ok(self.quizzes.lock().unwrap().remove(&id).is_some())
    }

    async fn add_question(
        &self,
        quiz_id: i64,
        req: &CreateQuestionRequest,
    ) -> Result<Option<(i64, QuizAggregate)>, sqlx::Error> {
        let mut quizzes = self.quizzes.lock().unwrap();
        let Some(aggregate) = quizzes.get_mut(&quiz_id) else {
            return Ok(None);
        };

        let position = req.position.unwrap_or_else(|| {
            aggregate
                .questions
                .iter()
                .map(|q| q.question.position)
                .max()
                .unwrap_or(0)
                + 1
        });

        let question = self.build_question(quiz_id, req, position);
        let question_id = question.question.id;
        aggregate.questions.push(question);

        Ok(Some((question_id, aggregate.clone())))
    }

    async fn update_question(
        &self,
        question_id: i64,
        req: &UpdateQuestionRequest,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        let mut quizzes = self.quizzes.lock().unwrap();

        for aggregate in quizzes.values_mut() {
            let Some(question) = aggregate
                .questions
                .iter_mut()
                .find(|q| q.question.id == question_id)
            else {
                continue;
            };

            if let Some(text) = &req.text {
                question.question.text = text.clone();
            }
            if let Some(position) = req.position {
                question.question.position = position;
            }
            if let Some(time_to_answer) = req.time_to_answer {
                question.question.time_to_answer = Some(time_to_answer);
            }
            if let Some(media_url) = &req.media_url {
                question.question.media_url = Some(media_url.clone());
            }
            if let Some(answers) = &req.answers {
                question.answers = answers
                    .iter()
                    .enumerate()
                    .map(|(index, answer)| Answer {
                        id: question_id * 100 + index as i64 + 1,
                        question_id,
                        text: answer.text.clone(),
                        is_correct: answer.is_correct,
                    })
                    .collect();
            }

            return Ok(Some(aggregate.clone()));
        }

        Ok(None)
    }

    async fn delete_question(
        &self,
        question_id: i64,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        let mut quizzes = self.quizzes.lock().unwrap();

        for aggregate in quizzes.values_mut() {
            if !aggregate.questions.iter().any(|q| q.question.id == question_id) {
                continue;
            }
            aggregate.questions.retain(|q| q.question.id != question_id);
            return Ok(Some(aggregate.clone()));
        }

        Ok(None)
    }
}

/// Store whose hard deletes always find the row already gone, as when a
/// concurrent request deleted the quiz between lookup and delete.
struct VanishingStore {
    inner: Arc<InMemoryStore>,
}

#[async_trait]
impl QuizStore for VanishingStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<QuizAggregate>, sqlx::Error> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<QuizAggregate>, sqlx::Error> {
        self.inner.find_all().await
    }
}

#[async_trait]
impl QuizWriteStore for VanishingStore {
    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<QuizAggregate, sqlx::Error> {
        self.inner.create_quiz(req).await
    }

    async fn update_quiz(
        &self,
        id: i64,
        req: &UpdateQuizRequest,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        self.inner.update_quiz(id, req).await
    }

    async fn delete_quiz(&self, _id: i64) -> Result<bool, sqlx::Error> {
        Ok(false)
    }

    async fn add_question(
        &self,
        quiz_id: i64,
        req: &CreateQuestionRequest,
    ) -> Result<Option<(i64, QuizAggregate)>, sqlx::Error> {
        self.inner.add_question(quiz_id, req).await
    }

    async fn update_question(
        &self,
        question_id: i64,
        req: &UpdateQuestionRequest,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        self.inner.update_question(question_id, req).await
    }

    async fn delete_question(
        &self,
        question_id: i64,
    ) -> Result<Option<QuizAggregate>, sqlx::Error> {
        self.inner.delete_question(question_id).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/unused".to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        cache_debug: false,
    }
}

fn app_over(store: Arc<InMemoryStore>) -> Router {
    let cache = QuizCacheService::new(Arc::new(MemoryCache::new()), store.clone(), false);
    create_router(AppState {
        config: test_config(),
        store,
        cache,
    })
}

async fn seed_quiz(store: &InMemoryStore, name: &str) -> QuizAggregate {
    store
        .create_quiz(&CreateQuizRequest {
            name: name.to_string(),
            status: Some("active".to_string()),
            questions: vec![CreateQuestionRequest {
                text: "What is the capital of France?".to_string(),
                position: Some(1),
                time_to_answer: Some(30),
                media_url: None,
                answers: vec![],
            }],
        })
        .await
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// ---------------------------------------------------------------------------
// Quiz routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_is_404() {
    let app = app_over(InMemoryStore::new());
    let (status, _) = send(&app, get("/api/v1/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_quiz_returns_camel_case_projection() {
    let store = InMemoryStore::new();
    let quiz = seed_quiz(&store, "Geography").await;
    let app = app_over(store);

    let (status, body) = send(&app, get(&format!("/api/v1/quizz/{}", quiz.id()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Geography");
    assert_eq!(body["status"], "active");
    assert_eq!(body["questions"][0]["timeToAnswer"], 30);
    assert_eq!(body["questions"][0]["mediaUrl"], Value::Null);
}

#[tokio::test]
async fn get_missing_quiz_maps_to_404_with_error_body() {
    let app = app_over(InMemoryStore::new());

    let (status, body) = send(&app, get("/api/v1/quizz/999")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn create_quiz_rejects_invalid_payload_with_400() {
    let app = app_over(InMemoryStore::new());

    let (status, body) = send(&app, with_json("POST", "/api/v1/quizz", json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            "/api/v1/quizz",
            json!({"name": "Quiz", "status": "archived"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn created_quiz_shows_up_in_listing() {
    let app = app_over(InMemoryStore::new());

    let (status, body) = send(
        &app,
        with_json("POST", "/api/v1/quizz", json!({"name": "History"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "draft");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = send(&app, get("/api/v1/quizz")).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert!(listed.iter().any(|q| q["id"] == id && q["name"] == "History"));
}

#[tokio::test]
async fn soft_delete_flips_status_to_off() {
    let store = InMemoryStore::new();
    let quiz = seed_quiz(&store, "Science").await;
    let app = app_over(store);
    let uri = format!("/api/v1/quizz/{}", quiz.id());

    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "off");
}

#[tokio::test]
async fn hard_delete_removes_the_quiz() {
    let store = InMemoryStore::new();
    let quiz = seed_quiz(&store, "Music").await;
    let app = app_over(store);
    let uri = format!("/api/v1/quizz/{}", quiz.id());

    let (status, _) = send(&app, with_json("DELETE", &uri, json!({"hard": true}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hard_delete_racing_a_concurrent_delete_is_404() {
    // find_by_id still sees the quiz but the delete removes no row.
    let inner = InMemoryStore::new();
    let quiz = seed_quiz(&inner, "Vanishing").await;
    let store = Arc::new(VanishingStore { inner });
    let cache = QuizCacheService::new(Arc::new(MemoryCache::new()), store.clone(), false);
    let app = create_router(AppState {
        config: test_config(),
        store,
        cache,
    });

    let (status, body) = send(
        &app,
        with_json(
            "DELETE",
            &format!("/api/v1/quizz/{}", quiz.id()),
            json!({"hard": true}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

// ---------------------------------------------------------------------------
// Question routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quiz_questions_listing_includes_total() {
    let store = InMemoryStore::new();
    let quiz = seed_quiz(&store, "Geography").await;
    let app = app_over(store);

    let (status, body) = send(&app, get(&format!("/api/v1/quizz/{}/questions", quiz.id()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quiz_id"], quiz.id());
    assert_eq!(body["total"], 1);
    assert_eq!(
        body["questions"][0]["text"],
        "What is the capital of France?"
    );
}

#[tokio::test]
async fn quiz_questions_listing_for_missing_quiz_is_404() {
    let app = app_over(InMemoryStore::new());
    let (status, _) = send(&app, get("/api/v1/quizz/42/questions")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn added_question_appears_in_the_listing() {
    let store = InMemoryStore::new();
    let quiz = seed_quiz(&store, "Geography").await;
    let app = app_over(store);

    let (status, body) = send(
        &app,
        with_json(
            "POST",
            &format!("/api/v1/quizz/{}/questions", quiz.id()),
            json!({
                "text": "Which river runs through Paris?",
                "answers": [{"text": "The Seine", "is_correct": true}],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["questions"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, get(&format!("/api/v1/quizz/{}/questions", quiz.id()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn add_question_rejects_short_text_with_400() {
    let store = InMemoryStore::new();
    let quiz = seed_quiz(&store, "Geography").await;
    let app = app_over(store);

    let (status, _) = send(
        &app,
        with_json(
            "POST",
            &format!("/api/v1/quizz/{}/questions", quiz.id()),
            json!({"text": "Hm?"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Cache admin routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cache_stats_route_reports_ttls() {
    let app = app_over(InMemoryStore::new());

    let (status, body) = send(&app, get("/api/v1/quizz/cache/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quiz_count"], 0);
    assert_eq!(body["quiz_ttl_secs"], 3600);
    assert_eq!(body["list_ttl_secs"], 900);
    assert_eq!(body["negative_ttl_secs"], 300);
}

#[tokio::test]
async fn warmup_route_counts_cached_quizzes() {
    let store = InMemoryStore::new();
    seed_quiz(&store, "One").await;
    seed_quiz(&store, "Two").await;
    let app = app_over(store);

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/quizz/cache/warmup")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = send(&app, get("/api/v1/quizz/cache/stats")).await;
    assert_eq!(body["quiz_count"], 2);
}

#[tokio::test]
async fn clear_route_empties_the_cache() {
    let store = InMemoryStore::new();
    let quiz = seed_quiz(&store, "One").await;
    let app = app_over(store);

    // Populate, then clear just this quiz's entry.
    send(&app, get(&format!("/api/v1/quizz/{}", quiz.id()))).await;
    let (_, body) = send(&app, get("/api/v1/quizz/cache/stats")).await;
    assert_eq!(body["quiz_count"], 1);

    let (status, _) = send(
        &app,
        with_json("POST", "/api/v1/quizz/cache/clear", json!({"quiz_id": quiz.id()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/api/v1/quizz/cache/stats")).await;
    assert_eq!(body["quiz_count"], 0);
}
