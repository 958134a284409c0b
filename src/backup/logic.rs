// docker-maintain/src/backup/logic.rs
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::archive::{TarContainer, compress, tar_path_for};
use super::dump::{ContainerExec, ServiceKind};
use super::manifest::ServiceManifest;
use crate::config::Ownership;
use crate::storage::apply_ownership;

/// Builds one dated archive per invocation: source tree, then one `<service>.sql` per database.
pub struct ArchiveBuilder<'a, E> {
    backup_dir: &'a Path,
    owner: Ownership,
    exec: E,
    date: NaiveDate,
}

impl<'a, E: ContainerExec> ArchiveBuilder<'a, E> {
    /// The archive date is fixed here and used for the whole build.
    pub fn new(backup_dir: &'a Path, owner: Ownership, exec: E) -> Self {
        Self::for_date(backup_dir, owner, exec, Local::now().date_naive())
    }

    pub fn for_date(backup_dir: &'a Path, owner: Ownership, exec: E, date: NaiveDate) -> Self {
        Self {
            backup_dir,
            owner,
            exec,
            date,
        }
    }

    /// Archives `source_dir` plus every database service in `manifest` and returns the `.tar.gz` path.
    ///
    /// A failing dump aborts the build. The partially written `.tar` is left in the
    /// backup directory and nothing is compressed.
    pub fn build(&self, source_dir: &Path, hostname: &str, manifest: &ServiceManifest) -> Result<PathBuf> {
        let tar_path = tar_path_for(self.backup_dir, hostname, self.date);

        let mut container = TarContainer::create(&tar_path)?;
        container.append_tree(source_dir)?;
        apply_ownership(container.path(), self.owner)?;

        for (service, image) in manifest.images() {
            let kind = ServiceKind::classify(image);
            if kind == ServiceKind::Unsupported {
                debug!("{}: image {} has no dump strategy, skipping", service, image);
                continue;
            }
            self.append_dump(&mut container, service, kind)?;
        }

        let tar_path = container.finish()?;
        let archive_path = compress(&tar_path)?;
        apply_ownership(&archive_path, self.owner)?;

        info!("✓ archive created at {}", archive_path.display());
        Ok(archive_path)
    }

    fn append_dump(&self, container: &mut TarContainer, service: &str, kind: ServiceKind) -> Result<()> {
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-", service))
            .suffix(".sql")
            .tempfile_in(self.backup_dir)
            .with_context(|| format!("Failed to create dump staging file in {}", self.backup_dir.display()))?;
        let sink = staging
            .as_file()
            .try_clone()
            .context("Failed to open dump staging file for writing")?;

        kind.dump(&self.exec, service, sink)
            .with_context(|| format!("Database dump of service {} failed", service))?;

        container.append_file(&format!("{}.sql", service), staging.path())
    }
}
