use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session: liveness, registration and login, the
/// read-only listings, the internal user API and the hometown view.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Creates an account. Duplicate emails are rejected.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Exchanges credentials for a bearer token.
        .route("/login", post(handlers::login))
        // GET /jobs, GET /departments
        // Listings are unauthenticated reads; mutations live in the authenticated router.
        .route("/jobs", get(handlers::list_jobs))
        .route("/departments", get(handlers::list_departments))
        // GET /api/users[/{id}]
        // Internal user API. The hometown view reads `{ "user": {...} }` from here.
        .route("/api/users", get(handlers::list_api_users))
        .route("/api/users/{id}", get(handlers::get_api_user))
        // GET /users/{id}/hometown
        // Runs the geocode → static map → image write pipeline for one user.
        .route("/users/{id}/hometown", get(handlers::get_hometown))
}
