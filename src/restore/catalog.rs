// docker-maintain/src/restore/catalog.rs
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Local,
    Remote,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Local => f.write_str("local"),
            Tier::Remote => f.write_str("remote"),
        }
    }
}

/// One archive name and the tiers it currently lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub tiers: BTreeSet<Tier>,
}

impl CatalogEntry {
    pub fn is_local(&self) -> bool {
        self.tiers.contains(&Tier::Local)
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tiers: Vec<String> = self.tiers.iter().map(Tier::to_string).collect();
        write!(f, "{} ({})", self.name, tiers.join(", "))
    }
}

/// Union of both tier listings by exact name, newest name first.
pub fn reconcile<L, R>(local: L, remote: R) -> Result<Vec<CatalogEntry>>
where
    L: IntoIterator,
    L::Item: AsRef<str>,
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    let mut merged: BTreeMap<String, BTreeSet<Tier>> = BTreeMap::new();
    for name in local {
        merged.entry(name.as_ref().to_string()).or_default().insert(Tier::Local);
    }
    for name in remote {
        merged.entry(name.as_ref().to_string()).or_default().insert(Tier::Remote);
    }

    if merged.is_empty() {
        return Err(AppError::NoBackupsFound);
    }

    Ok(merged
        .into_iter()
        .rev()
        .map(|(name, tiers)| CatalogEntry { name, tiers })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_reconcile_scenario() -> anyhow::Result<()> {
        let catalog = reconcile(
            ["docker_h_20240101.tar.gz"],
            ["docker_h_20240102.tar.gz", "docker_h_20240101.tar.gz"],
        )?;

        assert_eq!(names(&catalog), vec!["docker_h_20240102.tar.gz", "docker_h_20240101.tar.gz"]);
        assert_eq!(catalog[0].tiers, BTreeSet::from([Tier::Remote]));
        assert_eq!(catalog[1].tiers, BTreeSet::from([Tier::Local, Tier::Remote]));
        assert!(!catalog[0].is_local());
        assert!(catalog[1].is_local());
        assert_eq!(catalog[1].to_string(), "docker_h_20240101.tar.gz (local, remote)");
        Ok(())
    }

    #[test]
    fn test_reconcile_ignores_input_order() -> anyhow::Result<()> {
        let a = vec!["docker_h_20240103.tar.gz", "docker_h_20230101.tar.gz", "docker_h_20240102.tar.gz"];
        let b = vec!["docker_h_20240102.tar.gz", "docker_h_20250101.tar.gz"];
        let mut a_rev = a.clone();
        a_rev.reverse();
        let mut b_rev = b.clone();
        b_rev.reverse();

        let forward = reconcile(&a, &b)?;
        assert_eq!(forward, reconcile(&a_rev, &b_rev)?);

        // swapping the tiers flips the tags but never the identities or their order
        let swapped = reconcile(&b, &a)?;
        assert_eq!(names(&forward), names(&swapped));
        assert_eq!(
            names(&forward),
            vec![
                "docker_h_20250101.tar.gz",
                "docker_h_20240103.tar.gz",
                "docker_h_20240102.tar.gz",
                "docker_h_20230101.tar.gz",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_reconcile_is_idempotent_over_duplicates() -> anyhow::Result<()> {
        let catalog = reconcile(
            ["docker_h_20240101.tar.gz", "docker_h_20240101.tar.gz"],
            ["docker_h_20240101.tar.gz"],
        )?;
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].tiers.len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_union_is_no_backups_found() {
        let empty: [&str; 0] = [];
        assert!(matches!(reconcile(empty, empty), Err(AppError::NoBackupsFound)));
    }
}
