// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{assessment, auth, session, teacher},
    state::AppState,
    utils::jwt::{auth_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Public: auth and assessment browsing.
/// * Authenticated: sessions and the caller's results.
/// * Teacher: assessment and question-bank authoring.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let assessment_routes = Router::new()
        .route("/", get(assessment::list_assessments))
        .route("/{id}", get(assessment::get_assessment))
        // Protected assessment routes
        .merge(
            Router::new()
                .route("/{id}/sessions", post(session::start_session))
                .route("/{id}/results", get(assessment::my_results))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let session_routes = Router::new()
        .route("/{id}", get(session::get_session))
        .route("/{id}/answers", post(session::submit_answer))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let teacher_routes = Router::new()
        .route("/assessments", post(teacher::create_assessment))
        .route("/assessments/{id}/questions", post(teacher::add_question))
        .route(
            "/assessments/{id}/questions/{question_id}",
            delete(teacher::delete_question),
        )
        // Auth first, then the role check
        .layer(middleware::from_fn(teacher_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/assessments", assessment_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/teacher", teacher_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
