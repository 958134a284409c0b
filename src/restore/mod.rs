pub(crate) mod catalog;
mod logic;
pub(crate) mod selection;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::storage::local::LocalStore;
use crate::storage::remote::RemoteStore;
use crate::storage::s3::S3Bucket;
pub use logic::{RestoreController, RestoreReport};
use selection::TerminalSelection;

/// `restore`: pick an archive from either tier and unpack it over the docker directory.
///
/// Archives hold the docker directory as their top-level entry, so they are unpacked
/// into its parent.
pub async fn run_restore_flow(config: &Config) -> Result<RestoreReport> {
    let extract_root = config
        .docker_base
        .parent()
        .with_context(|| format!("{} has no parent directory", config.docker_base.display()))?;

    let local = LocalStore::new(&config.backup_base, &config.hostname)?;
    let bucket = match &config.s3 {
        Some(credentials) => Some(S3Bucket::connect(credentials).await),
        None => None,
    };
    let remote = RemoteStore::new(bucket, &config.hostname, config.owner)?;

    RestoreController::new(&local, &remote, extract_root)
        .run(&mut TerminalSelection::stdio())
        .await
}
