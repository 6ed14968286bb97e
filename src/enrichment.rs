//! Hometown enrichment pipeline.
//!
//! `Idle → UserLookup → ToponymLookup → CoordinatesResolved → ImageFetch → ImageWritten`
//!
//! Each stage is one sequential call. Any failure stops the run and is
//! returned as [`EnrichmentFailed`] naming the stage; nothing is retried and
//! nothing is cached between runs.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    models::{HometownView, UserEnvelope},
    storage::{ImageState, hometown_image_key},
};

/// Zoom level requested from the static map service.
pub const MAP_ZOOM: u8 = 13;
/// Map layer requested from the static map service (satellite).
pub const MAP_LAYER: &str = "sat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    UserLookup,
    ToponymLookup,
    CoordinatesResolved,
    ImageFetch,
    ImageWritten,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::UserLookup => "user_lookup",
            PipelineStage::ToponymLookup => "toponym_lookup",
            PipelineStage::CoordinatesResolved => "coordinates_resolved",
            PipelineStage::ImageFetch => "image_fetch",
            PipelineStage::ImageWritten => "image_written",
        };
        f.write_str(name)
    }
}

/// EnrichmentFailed
///
/// A stage of the pipeline could not complete: non-success HTTP status,
/// transport error, undecodable body, or a failed image write.
#[derive(Debug, Error)]
#[error("hometown enrichment failed during {stage}: {reason}")]
pub struct EnrichmentFailed {
    pub stage: PipelineStage,
    pub reason: String,
}

impl EnrichmentFailed {
    pub fn new(stage: PipelineStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// Coordinates
///
/// A geocoder position string, `"<lon> <lat>"`, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinates {
    pub pos: String,
}

impl Coordinates {
    pub fn new(pos: impl Into<String>) -> Self {
        Self { pos: pos.into() }
    }

    /// The `ll` parameter of the static map service: `"<lon>,<lat>"`.
    pub fn map_ll(&self) -> String {
        self.pos.split_whitespace().collect::<Vec<_>>().join(",")
    }
}

/// UserSummary
///
/// The fields of the internal user document the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub surname: String,
    pub city_from: String,
}

// --- Collaborator contracts ---

/// Resolves a user id to the internal user document.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn fetch_user(&self, user_id: i64) -> Result<UserSummary, EnrichmentFailed>;
}

/// Resolves a toponym to the coordinates of its first match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn locate(&self, toponym: &str) -> Result<Coordinates, EnrichmentFailed>;
}

/// Renders a satellite image centred on the given coordinates.
#[async_trait]
pub trait MapImageSource: Send + Sync {
    async fn fetch(&self, coordinates: &Coordinates) -> Result<Vec<u8>, EnrichmentFailed>;
}

/// geocoder_params
///
/// Query parameters of a geocoder request.
pub fn geocoder_params<'a>(api_key: &'a str, toponym: &'a str) -> [(&'static str, &'a str); 3] {
    [("apikey", api_key), ("geocode", toponym), ("format", "json")]
}

/// map_params
///
/// Query parameters of a static map request.
pub fn map_params(coordinates: &Coordinates) -> [(&'static str, String); 3] {
    [
        ("ll", coordinates.map_ll()),
        ("l", MAP_LAYER.to_string()),
        ("z", MAP_ZOOM.to_string()),
    ]
}

// --- Geocoder response DTOs ---

#[derive(Debug, Deserialize)]
struct GeocoderResponseDto {
    response: GeocoderBodyDto,
}

#[derive(Debug, Deserialize)]
struct GeocoderBodyDto {
    #[serde(rename = "GeoObjectCollection")]
    collection: GeoObjectCollectionDto,
}

#[derive(Debug, Deserialize)]
struct GeoObjectCollectionDto {
    #[serde(rename = "featureMember", default)]
    feature_member: Vec<FeatureMemberDto>,
}

#[derive(Debug, Deserialize)]
struct FeatureMemberDto {
    #[serde(rename = "GeoObject")]
    geo_object: GeoObjectDto,
}

#[derive(Debug, Deserialize)]
struct GeoObjectDto {
    #[serde(rename = "Point")]
    point: PointDto,
}

#[derive(Debug, Deserialize)]
struct PointDto {
    pos: String,
}

/// first_feature_coordinates
///
/// Decodes a geocoder JSON body and takes the first feature member. Later
/// members are never consulted.
pub fn first_feature_coordinates(body: &[u8]) -> Result<Coordinates, EnrichmentFailed> {
    let decoded: GeocoderResponseDto = serde_json::from_slice(body).map_err(|e| {
        EnrichmentFailed::new(
            PipelineStage::ToponymLookup,
            format!("invalid geocoder JSON payload: {e}"),
        )
    })?;
    decoded
        .response
        .collection
        .feature_member
        .into_iter()
        .next()
        .map(|member| Coordinates::new(member.geo_object.point.pos))
        .ok_or_else(|| {
            EnrichmentFailed::new(PipelineStage::ToponymLookup, "geocoder returned no objects")
        })
}

/// Sends a GET and returns the body of a successful response.
async fn get_success_body<Q: serde::Serialize + ?Sized>(
    client: &Client,
    url: &str,
    query: &Q,
    stage: PipelineStage,
) -> Result<Vec<u8>, EnrichmentFailed> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| EnrichmentFailed::new(stage, format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(EnrichmentFailed::new(stage, format!("http status {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| EnrichmentFailed::new(stage, format!("cannot read body: {e}")))?;
    Ok(body.to_vec())
}

// --- HTTP implementations ---

/// build_http_client
///
/// One reqwest client shared by every outbound adapter, with an explicit timeout.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// HttpUserDirectory
///
/// Reads `GET {base}/api/users/{id}` and extracts `user.surname` and `user.city_from`.
pub struct HttpUserDirectory {
    client: Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn fetch_user(&self, user_id: i64) -> Result<UserSummary, EnrichmentFailed> {
        let url = format!("{}/api/users/{}", self.base_url.trim_end_matches('/'), user_id);
        let no_query: [(&str, &str); 0] = [];
        let body =
            get_success_body(&self.client, &url, &no_query, PipelineStage::UserLookup).await?;
        let envelope: UserEnvelope = serde_json::from_slice(&body).map_err(|e| {
            EnrichmentFailed::new(PipelineStage::UserLookup, format!("invalid user document: {e}"))
        })?;
        Ok(UserSummary {
            id: envelope.user.id,
            surname: envelope.user.surname,
            city_from: envelope.user.city_from,
        })
    }
}

/// HttpGeocoder
pub struct HttpGeocoder {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpGeocoder {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn locate(&self, toponym: &str) -> Result<Coordinates, EnrichmentFailed> {
        let params = geocoder_params(&self.api_key, toponym);
        let body = get_success_body(
            &self.client,
            &self.endpoint,
            &params,
            PipelineStage::ToponymLookup,
        )
        .await?;
        first_feature_coordinates(&body)
    }
}

/// HttpStaticMap
pub struct HttpStaticMap {
    client: Client,
    endpoint: String,
}

impl HttpStaticMap {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl MapImageSource for HttpStaticMap {
    async fn fetch(&self, coordinates: &Coordinates) -> Result<Vec<u8>, EnrichmentFailed> {
        let params = map_params(coordinates);
        get_success_body(&self.client, &self.endpoint, &params, PipelineStage::ImageFetch).await
    }
}

// --- Pipeline ---

/// HometownPipeline
///
/// Drives one enrichment run per call. Holds no state between runs.
#[derive(Clone)]
pub struct HometownPipeline {
    users: Arc<dyn UserDirectory>,
    geocoder: Arc<dyn Geocoder>,
    maps: Arc<dyn MapImageSource>,
    images: ImageState,
}

impl HometownPipeline {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        geocoder: Arc<dyn Geocoder>,
        maps: Arc<dyn MapImageSource>,
        images: ImageState,
    ) -> Self {
        Self {
            users,
            geocoder,
            maps,
            images,
        }
    }

    /// render
    ///
    /// Runs every stage for `user_id` and returns where the image was written.
    pub async fn render(&self, user_id: i64) -> Result<HometownView, EnrichmentFailed> {
        tracing::debug!(user_id, stage = %PipelineStage::UserLookup, "starting hometown enrichment");
        let user = self.users.fetch_user(user_id).await?;

        tracing::debug!(user_id, stage = %PipelineStage::ToponymLookup, toponym = %user.city_from);
        let coordinates = self.geocoder.locate(&user.city_from).await?;
        tracing::debug!(user_id, stage = %PipelineStage::CoordinatesResolved, pos = %coordinates.pos);

        tracing::debug!(user_id, stage = %PipelineStage::ImageFetch, ll = %coordinates.map_ll());
        let image = self.maps.fetch(&coordinates).await?;

        let key = hometown_image_key(&user.surname);
        let location = self
            .images
            .put(&key, image)
            .await
            .map_err(|reason| EnrichmentFailed::new(PipelineStage::ImageWritten, reason))?;
        tracing::info!(user_id, stage = %PipelineStage::ImageWritten, image = %location, "hometown image written");

        Ok(HometownView {
            user_id: user.id,
            surname: user.surname,
            city_from: user.city_from,
            coordinates: coordinates.pos,
            image: location,
        })
    }
}
