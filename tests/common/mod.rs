#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use mars_colony::{
    AppConfig, AppState, HometownPipeline, InMemoryRepository, MockImageStore,
    enrichment::{
        Coordinates, EnrichmentFailed, Geocoder, MapImageSource, PipelineStage, UserDirectory,
        UserSummary,
    },
    models::{NewUser, User},
    repository::Repository,
};
use std::sync::Arc;
use tokio::net::TcpListener;

// Not a real PHC string; users seeded this way cannot log in.
pub const UNUSABLE_HASH: &str = "unusable";

/// Inserts a user straight into the store, skipping argon2.
pub async fn seed_user(repo: &InMemoryRepository, email: &str, surname: &str) -> User {
    repo.create_user(NewUser {
        surname: surname.to_string(),
        name: "Test".to_string(),
        age: 30,
        position: "colonist".to_string(),
        speciality: "engineer".to_string(),
        address: "module_1".to_string(),
        city_from: "Moscow".to_string(),
        email: email.to_string(),
        hashed_password: UNUSABLE_HASH.to_string(),
    })
    .await
    .unwrap()
}

// --- Enrichment stand-ins ---

/// Resolves every user id to the same document.
pub struct StubDirectory {
    pub surname: String,
    pub city_from: String,
}

#[async_trait]
impl UserDirectory for StubDirectory {
    async fn fetch_user(&self, user_id: i64) -> Result<UserSummary, EnrichmentFailed> {
        Ok(UserSummary {
            id: user_id,
            surname: self.surname.clone(),
            city_from: self.city_from.clone(),
        })
    }
}

pub struct StubGeocoder {
    pub pos: Option<String>,
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn locate(&self, _toponym: &str) -> Result<Coordinates, EnrichmentFailed> {
        self.pos
            .clone()
            .map(Coordinates::new)
            .ok_or_else(|| EnrichmentFailed::new(PipelineStage::ToponymLookup, "http status 500"))
    }
}

/// Returns the `ll` parameter as the image bytes, so tests can tell images apart.
pub struct EchoMap;

#[async_trait]
impl MapImageSource for EchoMap {
    async fn fetch(&self, coordinates: &Coordinates) -> Result<Vec<u8>, EnrichmentFailed> {
        Ok(coordinates.map_ll().into_bytes())
    }
}

pub fn stub_pipeline(images: MockImageStore) -> HometownPipeline {
    HometownPipeline::new(
        Arc::new(StubDirectory {
            surname: "Scott".to_string(),
            city_from: "Moscow".to_string(),
        }),
        Arc::new(StubGeocoder {
            pos: Some("37.617698 55.755864".to_string()),
        }),
        Arc::new(EchoMap),
        Arc::new(images),
    )
}

/// AppState over an in-memory store with stubbed enrichment collaborators.
pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo,
        hometown: stub_pipeline(MockImageStore::new()),
        config: AppConfig::default(),
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}
