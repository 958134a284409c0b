// docker-maintain/src/storage/remote.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::backup::archive::{archive_name_pattern, host_prefix};
use crate::config::Ownership;
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Minimal object-store surface the remote tier is built on.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn put_file(&self, key: &str, path: &Path) -> crate::errors::Result<()>;

    async fn list_objects(&self, prefix: &str) -> crate::errors::Result<Vec<RemoteObject>>;

    /// Deletes `keys` in one batch, returning the keys the store reports as deleted.
    async fn delete_objects(&self, keys: &[String]) -> crate::errors::Result<Vec<String>>;

    async fn get_to_file(&self, key: &str, destination: &Path) -> crate::errors::Result<()>;
}

/// Result of a remote rotation. A failed delete is reported, never raised.
#[derive(Debug)]
pub enum RotationOutcome {
    Inactive,
    NothingToDelete,
    Deleted(Vec<String>),
    DeleteFailed { keys: Vec<String>, error: AppError },
}

/// Remote tier. Without credentials it holds no store and every operation is a logged no-op.
pub struct RemoteStore<S> {
    store: Option<S>,
    prefix: String,
    pattern: Regex,
    owner: Ownership,
}

impl<S: ObjectStore> RemoteStore<S> {
    pub fn new(store: Option<S>, hostname: &str, owner: Ownership) -> Result<Self> {
        Ok(Self {
            store,
            prefix: format!("{}_", host_prefix(hostname)),
            pattern: archive_name_pattern(hostname)?,
            owner,
        })
    }

    pub fn is_active(&self) -> bool {
        self.store.is_some()
    }

    /// Uploads `path` under its base name. Returns `false` when the tier is inactive.
    pub async fn upload(&self, path: &Path) -> Result<bool> {
        let Some(store) = &self.store else {
            info!("s3 integration not active, skipping upload");
            return Ok(false);
        };
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Archive path has no usable file name: {}", path.display()))?;

        info!("upload {} to s3 bucket", key);
        store
            .put_file(key, path)
            .await
            .with_context(|| format!("Failed to upload {}", path.display()))?;
        Ok(true)
    }

    /// This host's archives, most recently modified first.
    ///
    /// Keys are matched against the same name pattern as local files, so hosts whose
    /// names share a prefix never see each other's archives.
    pub async fn list(&self) -> Result<Vec<RemoteObject>> {
        let Some(store) = &self.store else {
            return Ok(Vec::new());
        };
        let mut objects: Vec<RemoteObject> = store
            .list_objects(&self.prefix)
            .await
            .with_context(|| format!("Failed to list remote objects with prefix {}", self.prefix))?
            .into_iter()
            .filter(|o| self.pattern.is_match(&o.key))
            .collect();
        objects.sort_by(newest_first);
        Ok(objects)
    }

    /// Deletes every object past the `keep` most recent ones.
    ///
    /// Listing failures propagate; delete failures come back as `RotationOutcome::DeleteFailed`.
    pub async fn rotate(&self, keep: usize) -> Result<RotationOutcome> {
        let Some(store) = &self.store else {
            info!("s3 integration not active, skipping rotation");
            return Ok(RotationOutcome::Inactive);
        };

        let keys: Vec<String> = super::beyond_retention(self.list().await?, keep)
            .into_iter()
            .map(|o| o.key)
            .collect();
        if keys.is_empty() {
            info!("No objects to delete.");
            return Ok(RotationOutcome::NothingToDelete);
        }

        match store.delete_objects(&keys).await {
            Ok(deleted) => {
                info!("Deleted: {:?}", deleted);
                Ok(RotationOutcome::Deleted(deleted))
            }
            Err(error) => {
                let error = match error {
                    err @ AppError::RemoteDelete(_) => err,
                    other => AppError::RemoteDelete(other.to_string()),
                };
                warn!("Error deleting objects: {}", error);
                Ok(RotationOutcome::DeleteFailed { keys, error })
            }
        }
    }

    /// Fetches `key` into `dest_dir` and hands the file to the configured owner.
    ///
    /// The body lands in a hidden temporary file first; the archive name only appears
    /// once the whole object has been written.
    pub async fn download(&self, key: &str, dest_dir: &Path) -> Result<PathBuf> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| AppError::Remote(format!("cannot download {}: s3 integration not active", key)))?;

        info!("Download backup file: {}", key);
        let destination = dest_dir.join(key);
        let partial = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".part")
            .tempfile_in(dest_dir)
            .with_context(|| format!("Failed to create download file in {}", dest_dir.display()))?;
        store
            .get_to_file(key, partial.path())
            .await
            .with_context(|| format!("Failed to download {} to {}", key, destination.display()))?;
        partial
            .persist(&destination)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move download into {}", destination.display()))?;
        super::apply_ownership(&destination, self.owner)?;
        Ok(destination)
    }

    /// Upload of a fresh archive followed by optional rotation.
    pub async fn process(&self, archive_path: &Path, keep: Option<usize>) -> Result<()> {
        if !self.upload(archive_path).await? {
            return Ok(());
        }
        if let Some(keep) = keep {
            match self.rotate(keep).await? {
                RotationOutcome::Deleted(keys) => {
                    info!("remote rotation removed {} archive(s)", keys.len());
                }
                RotationOutcome::DeleteFailed { keys, error } => {
                    warn!("remote rotation left {} expired object(s) in place: {}", keys.len(), error);
                }
                RotationOutcome::Inactive | RotationOutcome::NothingToDelete => {}
            }
        }
        Ok(())
    }
}

fn newest_first(a: &RemoteObject, b: &RemoteObject) -> Ordering {
    match (a.last_modified, b.last_modified) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.key.cmp(&a.key))
}
