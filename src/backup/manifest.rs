// docker-maintain/src/backup/manifest.rs
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{AppError, Result};

pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeService {
    pub image: Option<String>,
}

/// The parts of a compose file the backup engine cares about: service name to declared image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceManifest {
    #[serde(default)]
    pub services: BTreeMap<String, ComposeService>,
}

impl ServiceManifest {
    pub fn load(compose_file: &Path) -> Result<Self> {
        if !compose_file.is_file() {
            return Err(AppError::Manifest(format!(
                "compose file not found: {}",
                compose_file.display()
            )));
        }
        let content = std::fs::read_to_string(compose_file)?;
        Self::parse(&content)
            .map_err(|e| AppError::Manifest(format!("{} ({})", e, compose_file.display())))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: ServiceManifest = serde_yaml::from_str(content)
            .map_err(|e| AppError::Manifest(format!("failed to parse compose file: {}", e)))?;
        if manifest.services.is_empty() {
            return Err(AppError::Manifest("no services defined in compose".into()));
        }
        Ok(manifest)
    }

    /// Services with a declared image, in name order.
    pub fn images(&self) -> impl Iterator<Item = (&str, &str)> {
        self.services
            .iter()
            .filter_map(|(name, svc)| svc.image.as_deref().map(|image| (name.as_str(), image)))
    }
}
