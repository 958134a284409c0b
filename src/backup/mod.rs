pub(crate) mod archive;
pub(crate) mod dump;
mod logic;
pub(crate) mod manifest;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::storage::local::LocalStore;
use crate::storage::remote::RemoteStore;
use crate::storage::s3::S3Bucket;
use crate::utils::find_executable;
use dump::DockerExec;
pub use logic::ArchiveBuilder;
use manifest::ServiceManifest;

/// `snapshot`: build the archive, push it to the remote tier, then rotate the local tier.
pub async fn run_snapshot_flow(config: &Config) -> Result<PathBuf> {
    let manifest = ServiceManifest::load(&config.compose_file())?;
    let docker = find_executable("docker")?;

    let builder = ArchiveBuilder::new(&config.backup_base, config.owner, DockerExec::new(docker));
    let archive_path = builder
        .build(&config.docker_base, &config.hostname, &manifest)
        .context("Snapshot build failed")?;

    let bucket = match &config.s3 {
        Some(credentials) => Some(S3Bucket::connect(credentials).await),
        None => None,
    };
    RemoteStore::new(bucket, &config.hostname, config.owner)?
        .process(&archive_path, config.rotate_s3)
        .await?;

    if let Some(keep) = config.rotate_local {
        let deleted = LocalStore::new(&config.backup_base, &config.hostname)?.rotate(keep)?;
        info!("local rotation removed {} archive(s)", deleted.len());
    }

    Ok(archive_path)
}
