//! S3-compatible bucket over plain HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::folder::{latest_folder_from_index, WEEKLY_INDEX};
use crate::{LoaderError, ResourceLoader};

/// Loader fetching objects with path-style URLs: `{endpoint}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpBucketLoader {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl HttpBucketLoader {
    /// Create a loader for `bucket` served at `endpoint`.
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint, bucket)
    }

    /// Create a loader reusing an existing HTTP client.
    pub fn with_client(
        client: Client,
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            client,
            endpoint,
            bucket: bucket.into(),
        }
    }

    /// URL of the bucket itself.
    pub fn bucket_url(&self) -> String {
        format!("{}/{}", self.endpoint, self.bucket)
    }

    /// URL of the object stored under `key`.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.bucket_url(), key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ResourceLoader for HttpBucketLoader {
    async fn load_resource(&self, name: &str) -> Result<Bytes, LoaderError> {
        let url = self.object_url(name);
        debug!(url = %url, "Fetching resource");

        let http_err = |source: reqwest::Error| LoaderError::Http {
            resource: name.to_string(),
            source,
        };
        let response = self.client.get(&url).send().await.map_err(http_err)?;

        match response.status() {
            status if status.is_success() => response.bytes().await.map_err(http_err),
            StatusCode::NOT_FOUND => Err(LoaderError::NotFound(name.to_string())),
            status => Err(LoaderError::UnexpectedStatus {
                resource: name.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn find_latest_resources_folder(&self) -> Result<String, LoaderError> {
        let content = self.load_resource(WEEKLY_INDEX).await?;
        let folder = latest_folder_from_index(&String::from_utf8_lossy(&content))
            .ok_or_else(|| LoaderError::NoResourceFolder(self.bucket_url()))?;
        info!(folder = %folder, "Found latest folder");
        Ok(folder)
    }

    async fn bucket_exists(&self) -> Result<bool, LoaderError> {
        let url = self.bucket_url();
        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|source| LoaderError::Http {
                resource: self.bucket.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(LoaderError::UnexpectedStatus {
                resource: self.bucket.clone(),
                status: status.as_u16(),
            }),
        }
    }
}
