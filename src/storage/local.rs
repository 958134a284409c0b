// docker-maintain/src/storage/local.rs
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backup::archive::archive_name_pattern;

/// Archives of one host kept in the local backup directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
    pattern: Regex,
}

impl LocalStore {
    pub fn new(dir: &Path, hostname: &str) -> Result<Self> {
        Ok(Self {
            dir: dir.to_path_buf(),
            pattern: archive_name_pattern(hostname)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Archive file names for this host, newest first.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read backup directory: {}", self.dir.display()))?
        {
            let entry = entry.with_context(|| format!("Failed to read entry in {}", self.dir.display()))?;
            if let Some(name) = entry.file_name().to_str() {
                if self.pattern.is_match(name) && entry.path().is_file() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Deletes every archive past the `keep` most recent ones and returns their names.
    pub fn rotate(&self, keep: usize) -> Result<Vec<String>> {
        let doomed = super::beyond_retention(self.list()?, keep);
        for name in &doomed {
            let path = self.path_of(name);
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete local backup: {}", path.display()))?;
            info!("Deleted: {}", name);
        }
        Ok(doomed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(names: &[&str]) -> anyhow::Result<(tempfile::TempDir, LocalStore)> {
        let dir = tempfile::tempdir()?;
        for name in names {
            fs::write(dir.path().join(name), name.as_bytes())?;
        }
        let store = LocalStore::new(dir.path(), "h")?;
        Ok((dir, store))
    }

    #[test]
    fn test_list_filters_and_sorts_newest_first() -> anyhow::Result<()> {
        let (dir, store) = store_with(&[
            "docker_h_20240101.tar.gz",
            "docker_h_20240315.tar.gz",
            "docker_h_20231231.tar.gz",
            "docker_other_20240401.tar.gz",
            "docker_h_20240102.tar",
            "notes.txt",
        ])?;
        fs::create_dir(dir.path().join("docker_h_20240501.tar.gz"))?;

        assert_eq!(
            store.list()?,
            vec![
                "docker_h_20240315.tar.gz",
                "docker_h_20240101.tar.gz",
                "docker_h_20231231.tar.gz",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_rotate_keeps_most_recent_for_every_count() -> anyhow::Result<()> {
        let names = [
            "docker_h_20240104.tar.gz",
            "docker_h_20240101.tar.gz",
            "docker_h_20240103.tar.gz",
            "docker_h_20240102.tar.gz",
        ];
        let mut newest_first = names.to_vec();
        newest_first.sort_unstable_by(|a, b| b.cmp(a));

        for keep in 0..=names.len() + 1 {
            let (dir, store) = store_with(&names)?;
            fs::write(dir.path().join("unrelated.txt"), "x")?;

            let deleted = store.rotate(keep)?;

            let expected: Vec<&str> = newest_first.iter().take(keep).copied().collect();
            assert_eq!(store.list()?, expected, "keep = {keep}");
            assert_eq!(deleted.len(), names.len().saturating_sub(keep));
            assert!(dir.path().join("unrelated.txt").exists());
        }
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = LocalStore::new(&dir.path().join("gone"), "h")?;
        assert!(store.list().is_err());
        assert!(store.rotate(1).is_err());
        Ok(())
    }
}
