// src/routes.rs

use axum::{
    Router, http::Method,
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{cache_admin, question, quiz},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Quiz and question CRUD plus cache administration under /api/v1.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store + cache service).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes).post(quiz::create_quiz))
        // Cache admin routes come before the id capture so the static
        // 'cache' segment wins.
        .route("/cache/stats", get(cache_admin::cache_stats))
        .route("/cache/warmup", post(cache_admin::warmup_cache))
        .route("/cache/clear", post(cache_admin::clear_cache))
        .route(
            "/{id}",
            get(quiz::get_quiz)
                .patch(quiz::update_quiz)
                .delete(quiz::delete_quiz),
        )
        .route(
            "/{id}/questions",
            get(question::get_quiz_questions).post(question::add_question),
        );

    let question_routes = Router::new().route(
        "/{id}",
        patch(question::update_question).delete(question::delete_question),
    );

    Router::new()
        .nest("/api/v1/quizz", quiz_routes)
        .nest("/api/v1/questions", question_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
