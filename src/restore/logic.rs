// docker-maintain/src/restore/logic.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use super::catalog::{CatalogEntry, reconcile};
use super::selection::{SelectionProvider, parse_selection};
use crate::backup::archive::extract_tar_gz_archive;
use crate::storage::local::LocalStore;
use crate::storage::remote::{ObjectStore, RemoteStore};

/// What a finished restore did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub archive: String,
    pub downloaded: bool,
    pub extracted_to: PathBuf,
}

/// Enumerate, select, ensure local, extract. Any failure ends the run.
pub struct RestoreController<'a, S> {
    local: &'a LocalStore,
    remote: &'a RemoteStore<S>,
    extract_root: &'a Path,
}

impl<'a, S: ObjectStore> RestoreController<'a, S> {
    pub fn new(local: &'a LocalStore, remote: &'a RemoteStore<S>, extract_root: &'a Path) -> Self {
        Self {
            local,
            remote,
            extract_root,
        }
    }

    pub async fn enumerate(&self) -> Result<Vec<CatalogEntry>> {
        let local = self.local.list()?;
        let remote: Vec<String> = if self.remote.is_active() {
            self.remote.list().await?.into_iter().map(|o| o.key).collect()
        } else {
            Vec::new()
        };
        Ok(reconcile(local, remote)?)
    }

    pub fn select<'c, P: SelectionProvider>(
        &self,
        catalog: &'c [CatalogEntry],
        provider: &mut P,
    ) -> Result<&'c CatalogEntry> {
        let raw = provider.choose(catalog)?;
        let idx = parse_selection(&raw, catalog.len())?;
        Ok(&catalog[idx])
    }

    /// Returns the local path of the selected archive and whether it had to be downloaded.
    pub async fn ensure_local(&self, entry: &CatalogEntry) -> Result<(PathBuf, bool)> {
        if entry.is_local() {
            info!("restore from local file");
            return Ok((self.local.path_of(&entry.name), false));
        }
        let path = self.remote.download(&entry.name, self.local.dir()).await?;
        Ok((path, true))
    }

    pub fn extract(&self, archive: &Path) -> Result<PathBuf> {
        extract_tar_gz_archive(archive, self.extract_root)
            .with_context(|| format!("Restore of {} failed", archive.display()))
    }

    pub async fn run<P: SelectionProvider>(&self, provider: &mut P) -> Result<RestoreReport> {
        let catalog = self.enumerate().await?;
        let entry = self.select(&catalog, provider)?;
        let (archive, downloaded) = self.ensure_local(entry).await?;
        let extracted_to = self.extract(&archive)?;

        info!("✓ restored {} into {}", entry.name, extracted_to.display());
        Ok(RestoreReport {
            archive: entry.name.clone(),
            downloaded,
            extracted_to,
        })
    }
}
