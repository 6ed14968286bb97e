use mars_colony::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    enrichment::{HometownPipeline, HttpGeocoder, HttpStaticMap, HttpUserDirectory, build_http_client},
    repository::{PostgresRepository, RepositoryState},
    storage::{FsImageStore, ImageState, S3ImageStore},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, the database, the image store
/// and the enrichment adapters, then serves HTTP.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets).
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins; otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mars_colony=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database: pool plus embedded schema migrations.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to run database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Image store: local directory, or S3 in production.
    let images: ImageState = match config.env {
        Env::Local => Arc::new(FsImageStore::new(&config.image_dir)),
        Env::Production => Arc::new(S3ImageStore::new(
            &config.s3_endpoint,
            &config.s3_region,
            &config.s3_key,
            &config.s3_secret,
            &config.s3_bucket,
        )),
    };
    if let Err(e) = images.ensure_ready().await {
        panic!("FATAL: image store unavailable: {e}");
    }

    // 5. Enrichment adapters share one HTTP client with a bounded timeout.
    let http = build_http_client(Duration::from_secs(config.http_timeout_secs))
        .expect("FATAL: Failed to build HTTP client.");
    let hometown = HometownPipeline::new(
        Arc::new(HttpUserDirectory::new(http.clone(), &config.user_api_url)),
        Arc::new(HttpGeocoder::new(
            http.clone(),
            &config.geocoder_url,
            &config.geocoder_api_key,
        )),
        Arc::new(HttpStaticMap::new(http, &config.static_map_url)),
        images,
    );

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        hometown,
        config,
    });

    // 7. Server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind listener.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated.");
}
