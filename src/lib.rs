use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod access;
pub mod auth;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod manager;
pub mod models;
pub mod repository;
pub mod storage;

// Routing segregated by access level (public, authenticated).
pub mod routes;
use access::Principal;
use errors::ManagerError;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use enrichment::HometownPipeline;
pub use manager::ResourceManager;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{FsImageStore, ImageState, MockImageStore, S3ImageStore};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::get_me,
        handlers::list_jobs, handlers::create_job, handlers::get_job,
        handlers::update_job, handlers::delete_job,
        handlers::list_departments, handlers::create_department, handlers::get_department,
        handlers::update_department, handlers::delete_department,
        handlers::list_api_users, handlers::get_api_user, handlers::get_hometown
    ),
    components(
        schemas(
            models::User, models::Job, models::Department, models::RegisterUserRequest,
            models::LoginRequest, models::LoginResponse, models::JobRequest,
            models::DepartmentRequest, models::UserEnvelope, models::UserList,
            models::HometownView,
        )
    ),
    tags(
        (name = "mars-colony", description = "Colony personnel and task tracking API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned into
/// every request.
#[derive(Clone)]
pub struct AppState {
    /// Resource Store.
    pub repo: RepositoryState,
    /// Hometown enrichment pipeline (owns its own image store handle).
    pub hometown: HometownPipeline,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// The Resource Manager over this state's store.
    pub fn manager(&self) -> ResourceManager {
        ResourceManager::new(self.repo.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless a `Principal` can be extracted.
async fn auth_middleware(_principal: Principal, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies the authentication layer to the
/// authenticated module and wraps everything in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Unknown routes answer like a missing record.
        .fallback(|| async { ManagerError::NotFoundOrForbidden })
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, correlated by its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
