use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes that require a session. The `Principal` extractor layer above this
/// router rejects anonymous requests with 401 before any handler runs; the
/// ownership rule is then applied per record by the Resource Manager.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The acting principal's own user record.
        .route("/me", get(handlers::get_me))
        // POST /jobs
        // Creates a job owned by the principal. The team leader must exist.
        .route("/jobs", post(handlers::create_job))
        // GET/PUT/DELETE /jobs/{id}
        // Owner or superuser only; everyone else sees 404.
        .route(
            "/jobs/{id}",
            get(handlers::get_job)
                .put(handlers::update_job)
                .delete(handlers::delete_job),
        )
        // POST /departments
        // Creates a department owned by the principal. The chief must exist.
        .route("/departments", post(handlers::create_department))
        // GET/PUT/DELETE /departments/{id}
        // Same ownership rule as jobs.
        .route(
            "/departments/{id}",
            get(handlers::get_department)
                .put(handlers::update_department)
                .delete(handlers::delete_department),
        )
}
