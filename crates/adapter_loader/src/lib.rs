//! Resource loaders for periodically published reference-data extracts.
//!
//! As part of the **A**dapter layer, this crate hides where the raw
//! pipe-delimited files live. The rest of the workspace depends only on the
//! [`ResourceLoader`] capability:
//!
//! - [`FsBucketLoader`]: a local directory treated as a bucket
//! - [`HttpBucketLoader`]: an S3-compatible bucket reached over plain HTTP
//! - [`InMemoryLoader`]: fixed in-memory resources, used by tests
//! - [`ZipBundleLoader`]: resources packed in one `weekly.zip` per folder,
//!   fetched through any of the above
//!
//! Extracts are published under dated folders (`YYYY-MM-DD/`); the most recent
//! one is discovered with [`ResourceLoader::find_latest_resources_folder`].

mod bundle;
mod error;
mod folder;
mod fs;
mod http;
mod memory;

pub use bundle::{ZipBundleLoader, BUNDLE_DIR, BUNDLE_OBJECT};
pub use error::LoaderError;
pub use folder::{latest_dated_folder, latest_folder_from_index, WEEKLY_INDEX};
pub use fs::FsBucketLoader;
pub use http::HttpBucketLoader;
pub use memory::InMemoryLoader;

use async_trait::async_trait;
use bytes::Bytes;

/// Access to named resources in an object store.
///
/// Each call to [`load_resource`](ResourceLoader::load_resource) performs one
/// full read of the object and releases the underlying stream before
/// returning, so read and close failures both surface as a [`LoaderError`].
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Read the whole resource stored under `name`.
    async fn load_resource(&self, name: &str) -> Result<Bytes, LoaderError>;

    /// Name of the most recent dated folder holding a complete extract.
    async fn find_latest_resources_folder(&self) -> Result<String, LoaderError>;

    /// Connectivity check used by health endpoints.
    async fn bucket_exists(&self) -> Result<bool, LoaderError>;
}
