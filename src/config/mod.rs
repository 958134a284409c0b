// docker-maintain/src/config/mod.rs
use nix::unistd::User;
use std::env;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, Result};

const DEFAULT_REGION: &str = "us-east-1";
const FALLBACK_HOSTNAME: &str = "host";

/// Numeric owner applied to every archive this tool writes, so backups taken
/// under sudo still belong to the invoking user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub endpoint_url: Option<String>,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub home: PathBuf,
    pub backup_base: PathBuf,
    pub docker_base: PathBuf,
    pub owner: Ownership,
    pub hostname: String,
    /// `None` when any of key id, secret or bucket is missing; remote tier is then inactive.
    pub s3: Option<S3Credentials>,
    pub rotate_local: Option<usize>,
    pub rotate_s3: Option<usize>,
}

impl Config {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let username = get("SUDO_USER")
            .ok_or_else(|| AppError::Config("sudo user not found (SUDO_USER is unset)".into()))?;

        let home = match get("MAINTAIN_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => home_of(&username)?,
        };

        let backup_base = existing_dir(&home, "backup")?;
        let docker_base = existing_dir(&home, "docker")?;

        let owner = Ownership {
            uid: parse_id(get("SUDO_UID"), "SUDO_UID")?,
            gid: parse_id(get("SUDO_GID"), "SUDO_GID")?,
        };

        let hostname = get("MAINTAIN_HOSTNAME").unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| FALLBACK_HOSTNAME.to_string())
        });

        let s3 = match (
            get("AWS_ACCESS_KEY_ID"),
            get("AWS_SECRET_ACCESS_KEY"),
            get("BUCKET_NAME"),
        ) {
            (Some(access_key_id), Some(secret_access_key), Some(bucket_name)) => Some(S3Credentials {
                access_key_id,
                secret_access_key,
                bucket_name,
                endpoint_url: get("ENDPOINT_URL"),
                region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            }),
            _ => None,
        };

        Ok(Config {
            username,
            home,
            backup_base,
            docker_base,
            owner,
            hostname,
            s3,
            rotate_local: parse_retention(get("ROTATE_LOCAL"), "ROTATE_LOCAL")?,
            rotate_s3: parse_retention(get("ROTATE_S3"), "ROTATE_S3")?,
        })
    }

    /// Human readable environment banner printed before every command.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n================ DOCKER MAINTAIN ================");
        let _ = writeln!(out, "paths:");
        let _ = writeln!(out, "  - home: {}", self.home.display());
        let _ = writeln!(out, "  - docker: {}", self.docker_base.display());
        let _ = writeln!(out, "  - backup: {}", self.backup_base.display());
        let _ = writeln!(out, "user:");
        let _ = writeln!(
            out,
            "  {} ({}/{}) on host [{}]",
            self.username, self.owner.uid, self.owner.gid, self.hostname
        );
        if let Some(s3) = &self.s3 {
            let _ = writeln!(out, "bucket:");
            let _ = writeln!(out, "  - {}", s3.bucket_name);
        }
        out
    }

    pub fn compose_file(&self) -> PathBuf {
        self.docker_base.join(crate::backup::manifest::COMPOSE_FILE_NAME)
    }
}

fn home_of(username: &str) -> Result<PathBuf> {
    let user = User::from_name(username)
        .map_err(|e| AppError::Config(format!("failed to look up user {}: {}", username, e)))?
        .ok_or_else(|| AppError::Config(format!("user {} not found", username)))?;
    Ok(user.dir)
}

fn existing_dir(home: &Path, name: &str) -> Result<PathBuf> {
    let dir = home.join(name);
    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "missing {}_base folder: {}",
            name,
            dir.display()
        )));
    }
    Ok(dir)
}

fn parse_id(value: Option<String>, key: &str) -> Result<u32> {
    let raw = value.ok_or_else(|| AppError::Config(format!("{} must be set", key)))?;
    raw.parse::<u32>()
        .map_err(|_| AppError::Config(format!("{} must be a numeric id, got '{}'", key, raw)))
}

fn parse_retention(value: Option<String>, key: &str) -> Result<Option<usize>> {
    value
        .map(|raw| {
            raw.parse::<usize>().map_err(|_| {
                AppError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn home_with_dirs() -> anyhow::Result<TempDir> {
        let home = tempfile::tempdir()?;
        std::fs::create_dir(home.path().join("backup"))?;
        std::fs::create_dir(home.path().join("docker"))?;
        Ok(home)
    }

    fn base_vars(home: &Path) -> HashMap<String, String> {
        [
            ("SUDO_USER", "alice".to_string()),
            ("SUDO_UID", "1000".to_string()),
            ("SUDO_GID", "1001".to_string()),
            ("MAINTAIN_HOME", home.display().to_string()),
            ("MAINTAIN_HOSTNAME", "box".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn load(vars: &HashMap<String, String>) -> Result<Config> {
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_minimal_environment_disables_remote() -> anyhow::Result<()> {
        let home = home_with_dirs()?;
        let config = load(&base_vars(home.path()))?;

        assert_eq!(config.username, "alice");
        assert_eq!(config.owner, Ownership { uid: 1000, gid: 1001 });
        assert_eq!(config.hostname, "box");
        assert_eq!(config.backup_base, home.path().join("backup"));
        assert_eq!(config.docker_base, home.path().join("docker"));
        assert!(config.s3.is_none());
        assert_eq!(config.rotate_local, None);
        assert_eq!(config.rotate_s3, None);
        Ok(())
    }

    #[test]
    fn test_full_credentials_enable_remote() -> anyhow::Result<()> {
        let home = home_with_dirs()?;
        let mut vars = base_vars(home.path());
        vars.insert("AWS_ACCESS_KEY_ID".into(), "key".into());
        vars.insert("AWS_SECRET_ACCESS_KEY".into(), "secret".into());
        vars.insert("BUCKET_NAME".into(), "backups".into());
        vars.insert("ENDPOINT_URL".into(), "https://s3.example.net".into());
        vars.insert("ROTATE_S3".into(), "7".into());
        vars.insert("ROTATE_LOCAL".into(), "0".into());

        let config = load(&vars)?;
        let s3 = config.s3.as_ref().expect("remote should be configured");
        assert_eq!(s3.bucket_name, "backups");
        assert_eq!(s3.endpoint_url.as_deref(), Some("https://s3.example.net"));
        assert_eq!(s3.region, DEFAULT_REGION);
        assert_eq!(config.rotate_s3, Some(7));
        assert_eq!(config.rotate_local, Some(0));
        assert!(config.summary().contains("backups"));
        Ok(())
    }

    #[test]
    fn test_partial_or_empty_credentials_disable_remote() -> anyhow::Result<()> {
        let home = home_with_dirs()?;
        let mut vars = base_vars(home.path());
        vars.insert("AWS_ACCESS_KEY_ID".into(), "key".into());
        vars.insert("AWS_SECRET_ACCESS_KEY".into(), "secret".into());
        vars.insert("BUCKET_NAME".into(), "  ".into());

        assert!(load(&vars)?.s3.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_sudo_user_is_config_error() -> anyhow::Result<()> {
        let home = home_with_dirs()?;
        let mut vars = base_vars(home.path());
        vars.remove("SUDO_USER");

        assert!(matches!(load(&vars), Err(AppError::Config(_))));
        Ok(())
    }

    #[test]
    fn test_missing_docker_dir_is_config_error() -> anyhow::Result<()> {
        let home = tempfile::tempdir()?;
        std::fs::create_dir(home.path().join("backup"))?;

        let err = load(&base_vars(home.path())).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("docker_base")));
        Ok(())
    }

    #[test]
    fn test_invalid_numbers_are_rejected() -> anyhow::Result<()> {
        let home = home_with_dirs()?;

        let mut vars = base_vars(home.path());
        vars.insert("SUDO_UID".into(), "alice".into());
        assert!(matches!(load(&vars), Err(AppError::Config(_))));

        let mut vars = base_vars(home.path());
        vars.insert("ROTATE_LOCAL".into(), "-1".into());
        assert!(matches!(load(&vars), Err(AppError::Config(_))));
        Ok(())
    }
}
