use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// ImageStore
///
/// Destination for hometown images produced by the enrichment pipeline. The
/// filesystem store is used locally; the S3 store in production. Both are
/// addressed by the same key, so the surname-keyed namespace is shared by
/// every implementation.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Ensures the destination (directory or bucket) exists. Called at startup.
    async fn ensure_ready(&self) -> Result<(), String>;

    /// Writes `bytes` under `key`, replacing any previous image. Returns the
    /// location the image can be found at.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, String>;
}

/// hometown_image_key
///
/// The file name for a user's hometown image, derived from the surname only.
/// Two users sharing a surname share one image.
pub fn hometown_image_key(surname: &str) -> String {
    format!("hometown_{}.jpg", sanitize_key(surname))
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`, separators) from a
/// user-provided key segment.
fn sanitize_key(key: &str) -> String {
    key.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("_")
}

// 1. Filesystem Implementation (Local)
/// FsImageStore
///
/// Writes images into a directory on local disk (`static/img` by default).
#[derive(Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn ensure_ready(&self) -> Result<(), String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("cannot create {}: {e}", self.root.display()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, String> {
        let path = self.root.join(key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
        Ok(path.display().to_string())
    }
}

// 2. S3 Implementation (Production)
/// S3ImageStore
///
/// Writes images to an S3-compatible bucket under the `img/` prefix.
/// `force_path_style(true)` keeps it compatible with MinIO-style endpoints.
#[derive(Clone)]
pub struct S3ImageStore {
    client: s3::Client,
    bucket_name: String,
}

impl S3ImageStore {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    /// Creates the bucket if missing. An "already owned" error is expected on
    /// every start after the first and is not a failure.
    async fn ensure_ready(&self) -> Result<(), String> {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket for {}: {}", self.bucket_name, e);
        }
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, String> {
        let object_key = format!("img/{key}");
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&object_key)
            .content_type("image/jpeg")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("s3://{}/{}", self.bucket_name, object_key))
    }
}

// 3. The Mock Implementation (For Tests)
/// MockImageStore
///
/// Keeps written images in memory so tests can inspect exactly what the
/// pipeline stored under each key.
#[derive(Clone, Default)]
pub struct MockImageStore {
    /// When true, every write fails.
    pub should_fail: bool,
    images: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.images
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn ensure_ready(&self) -> Result<(), String> {
        Ok(())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Image Store Error: Simulation requested".to_string());
        }
        self.images
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), bytes);
        Ok(format!("mock://{key}"))
    }
}

/// ImageState
///
/// The concrete type used to share the image store across the application state.
pub type ImageState = Arc<dyn ImageStore>;
