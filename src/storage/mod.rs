pub(crate) mod local;
pub(crate) mod remote;
pub(crate) mod s3;

use anyhow::{Context, Result};
use nix::unistd::{Gid, Uid, chown};
use std::path::Path;

use crate::config::Ownership;

/// Hands a file written by this (possibly elevated) process to the configured owner.
pub fn apply_ownership(path: &Path, owner: Ownership) -> Result<()> {
    chown(
        path,
        Some(Uid::from_raw(owner.uid)),
        Some(Gid::from_raw(owner.gid)),
    )
    .with_context(|| {
        format!(
            "Failed to set ownership {}:{} on {}",
            owner.uid,
            owner.gid,
            path.display()
        )
    })
}

/// Entries past the first `keep` of a newest-first listing.
pub fn beyond_retention<T>(newest_first: Vec<T>, keep: usize) -> Vec<T> {
    newest_first.into_iter().skip(keep).collect()
}
