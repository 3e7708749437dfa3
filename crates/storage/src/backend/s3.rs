//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Yandex Object Storage, Backblaze B2, MinIO and
//! others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly by the caller (the configuration layer
//! pulls them from the environment). Endpoint and region selection are the
//! caller's business too.

use crate::{
    StorageBackend,
    error::{ErrorKind, Result},
    to_key,
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    primitives::ByteStream,
};
use exn::ResultExt;
use std::path::Path;

/// S3-compatible storage backend.
///
/// Stores objects in an S3 bucket, optionally under a key prefix. All keys are
/// relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use packsync_storage::backend::S3Backend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "yandex",
///     "modpacks-bucket",
///     None,
///     "ru-central1",
///     Some("https://storage.yandexcloud.net"),
///     "access_key_id",
///     "secret_access_key",
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - Provider-specific region (e.g., "ru-central1")
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.map(to_key).transpose()?;
        let credentials = Credentials::new(key_id, key_secret, None, None, "packsync-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // A failed request fails the run; the caller decides whether to
            // run again.
            .retry_config(RetryConfig::disabled())
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Yandex, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());
        Ok(Self {
            name: name.into(),
            client,
            bucket: bucket.into(),
            prefix,
        })
    }

    /// Construct the full S3 key from a relative key.
    fn full_key(&self, path: &Path) -> Result<String> {
        Ok(join_key(self.prefix.as_deref(), &to_key(path)?))
    }
}

fn join_key(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = self.full_key(path)?;
        let output = match self.client.get_object().bucket(&self.bucket).key(&key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()))
            },
            Err(err) => return Err(err).or_raise(|| ErrorKind::Network(format!("GetObject `{key}`"))),
        };
        let body = output.body.collect().await.or_raise(|| ErrorKind::Network(format!("GetObject body `{key}`")))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let key = self.full_key(path)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("PutObject `{key}`")))?;
        Ok(())
    }

    async fn upload(&self, source: &Path, path: &Path) -> Result<()> {
        let key = self.full_key(path)?;
        // Streams from disk; the file is never held in memory as a whole.
        let body = ByteStream::from_path(source)
            .await
            .or_raise(|| ErrorKind::BackendError(format!("unable to open `{}` for upload", source.display())))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("PutObject `{key}`")))?;
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        // S3 reports success for keys that don't exist.
        let key = self.full_key(path)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("DeleteObject `{key}`")))?;
        Ok(())
    }
}
