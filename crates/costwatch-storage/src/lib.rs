//! JSON document persistence for costwatch.
//!
//! A [`DocumentStore`] maps hierarchical string keys to JSON objects. Two
//! backends exist: [`s3::S3Store`] for an S3 bucket reached through the
//! ambient AWS credential chain, and [`local::LocalFileStore`] which mirrors
//! the same key layout under a local directory. [`connect`] picks one at
//! startup; callers never branch on the backend afterwards.
//!
//! [`repository::CostRepository`] owns the key layout (see [`keys`]) and the
//! append-to-bucket semantics on top of a store.

pub mod error;
pub mod keys;
pub mod local;
pub mod repository;
pub mod s3;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use error::{Result, StorageError};
pub use local::LocalFileStore;
pub use repository::{BulkOutcome, CostRepository};
pub use s3::S3Store;

/// Describes the backend currently in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct StorageInfo {
    /// `"s3"` or `"local"`.
    pub backend: String,
    /// Bucket name or local directory.
    pub location: String,
    /// `true` when a remote store was preferred but could not be reached.
    pub fallback: bool,
    pub healthy: bool,
}

/// Key/value persistence of JSON documents.
///
/// Implementors provide the fallible primitives; the soft-fail methods
/// (`get`, `put`, `list`, `delete`) are what the rest of the system calls
/// when a storage problem must not abort the caller.
///
/// There are no transactions and no locking: `write` overwrites the whole
/// document unconditionally, so concurrent read-modify-write cycles on the
/// same key are last-writer-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name and location.
    fn info(&self) -> StorageInfo;

    /// Reads a document. `Ok(None)` means the key does not exist.
    async fn read(&self, key: &str) -> Result<Option<Value>>;

    /// Serialises the document with two-space indentation and overwrites the key.
    async fn write(&self, key: &str, value: &Value) -> Result<()>;

    /// Lists `*.json` keys starting with `prefix`, sorted.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Removes a key. Returns `false` when nothing was there.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> bool {
        true
    }

    /// Like [`read`](Self::read) but any error is logged and reported as absent.
    async fn get(&self, key: &str) -> Option<Value> {
        match self.read(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to read document");
                None
            }
        }
    }

    /// Like [`write`](Self::write) but returns `false` instead of an error.
    async fn put(&self, key: &str, value: &Value) -> bool {
        match self.write(key, value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to write document");
                false
            }
        }
    }

    /// Like [`list_keys`](Self::list_keys) but errors yield an empty list.
    async fn list(&self, prefix: &str) -> Vec<String> {
        match self.list_keys(prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(prefix = %prefix, error = %e, "Failed to list documents");
                Vec::new()
            }
        }
    }

    /// Like [`remove`](Self::remove) but errors yield `false`.
    async fn delete(&self, key: &str) -> bool {
        match self.remove(key).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to delete document");
                false
            }
        }
    }
}

/// Settings consumed by [`connect`].
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    pub local_dir: PathBuf,
    /// Try S3 first. When `false` the local store is used directly.
    pub prefer_remote: bool,
    /// Upper bound on the S3 credential and bucket check.
    pub connect_timeout: Duration,
}

/// Chooses the backend once at startup.
///
/// When `prefer_remote` is set, the S3 store is checked with the ambient
/// credential chain (creating the bucket if it is missing). Any failure or
/// timeout falls back to a [`LocalFileStore`] flagged as a fallback, which
/// makes health report `degraded`. Only a failure to prepare the local
/// directory is fatal.
pub async fn connect(settings: &StorageSettings) -> Result<Arc<dyn DocumentStore>> {
    let mut fallback = false;
    if settings.prefer_remote {
        let attempt = S3Store::connect(&settings.bucket, &settings.region);
        match tokio::time::timeout(settings.connect_timeout, attempt).await {
            Ok(Ok(store)) => {
                tracing::info!(
                    bucket = %settings.bucket,
                    region = %settings.region,
                    "Using S3 document store"
                );
                return Ok(Arc::new(store));
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "S3 unavailable, falling back to local storage");
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = settings.connect_timeout.as_secs(),
                    "S3 connection timed out, falling back to local storage"
                );
            }
        }
        fallback = true;
    }

    let local = LocalFileStore::open(&settings.local_dir)
        .await?
        .with_fallback(fallback);
    tracing::info!(dir = %settings.local_dir.display(), "Using local document store");
    Ok(Arc::new(local))
}
