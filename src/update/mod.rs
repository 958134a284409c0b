// docker-maintain/src/update/mod.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

use crate::backup::manifest::ServiceManifest;
use crate::config::Config;
use crate::utils::{find_executable, run_attached};

/// `docker compose -f <file>` driver for pulling and restarting the stack.
pub struct ComposeStack {
    docker: PathBuf,
    compose_file: PathBuf,
}

impl ComposeStack {
    pub fn new(docker: PathBuf, compose_file: &Path) -> Self {
        Self {
            docker,
            compose_file: compose_file.to_path_buf(),
        }
    }

    fn compose(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.docker);
        cmd.arg("compose").arg("-f").arg(&self.compose_file).args(args);
        cmd
    }

    /// Each step must exit zero before the next one runs.
    pub fn steps(&self) -> Vec<Command> {
        vec![
            self.compose(&["pull"]),
            self.compose(&["down", "--remove-orphans"]),
            self.compose(&["up", "-d"]),
        ]
    }

    /// Runs the steps in order with compose output going straight to the terminal.
    pub fn update(&self) -> Result<()> {
        for mut step in self.steps() {
            run_attached(&mut step).context("Container update failed")?;
        }
        Ok(())
    }
}

/// `update`: pull new images, take the stack down and bring it back up.
pub fn run_update_flow(config: &Config) -> Result<()> {
    let compose_file = config.compose_file();
    // Refuse to touch the stack when the manifest is missing or empty.
    ServiceManifest::load(&compose_file)?;
    let stack = ComposeStack::new(find_executable("docker")?, &compose_file);
    info!("updating containers from {}", compose_file.display());
    stack.update()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_steps_pull_down_up() {
        let stack = ComposeStack::new(PathBuf::from("docker"), Path::new("/srv/docker/docker-compose.yml"));
        let steps: Vec<Vec<String>> = stack.steps().iter().map(args).collect();
        let file = "/srv/docker/docker-compose.yml";
        assert_eq!(steps[0], vec!["compose", "-f", file, "pull"]);
        assert_eq!(steps[1], vec!["compose", "-f", file, "down", "--remove-orphans"]);
        assert_eq!(steps[2], vec!["compose", "-f", file, "up", "-d"]);
    }

    #[test]
    fn test_update_stops_at_first_failure() -> anyhow::Result<()> {
        // `false` ignores its arguments and exits 1.
        let stack = ComposeStack::new(find_executable("false")?, Path::new("compose.yml"));
        let err = stack.update().unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Command { .. })));
        Ok(())
    }
}
