// docker-maintain/src/backup/dump.rs
use std::fs::File;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::info;

use crate::errors::{AppError, Result};
use crate::utils::run_checked;

/// Database flavour of a compose service, decided once from its declared image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    MariaDb,
    Postgres,
    Unsupported,
}

impl ServiceKind {
    pub fn classify(image: &str) -> Self {
        if image.starts_with("mariadb") {
            ServiceKind::MariaDb
        } else if image.starts_with("postgres") {
            ServiceKind::Postgres
        } else {
            ServiceKind::Unsupported
        }
    }

    /// Shell snippet echoing the credential the dump tool needs.
    fn credential_query(self) -> Option<&'static str> {
        match self {
            ServiceKind::MariaDb => Some(r#"echo "$MYSQL_ROOT_PASSWORD""#),
            ServiceKind::Postgres => Some(r#"echo "$POSTGRES_USER""#),
            ServiceKind::Unsupported => None,
        }
    }

    fn dump_args(self, credential: &str) -> Vec<String> {
        match self {
            ServiceKind::MariaDb => vec![
                "mariadb-dump".into(),
                "-u".into(),
                "root".into(),
                format!("-p{}", credential),
                "--all-databases".into(),
            ],
            ServiceKind::Postgres => vec!["pg_dump".into(), "-U".into(), credential.into()],
            ServiceKind::Unsupported => Vec::new(),
        }
    }

    /// Runs the two-step dump against a running service, writing the dump body into `sink`.
    ///
    /// Returns `Ok(false)` for unsupported services without touching the container.
    pub fn dump<E: ContainerExec>(self, exec: &E, service: &str, sink: File) -> Result<bool> {
        let Some(query) = self.credential_query() else {
            return Ok(false);
        };
        info!("{}: backup {:?} container", service, self);

        let raw = exec
            .capture(service, &["bash".to_string(), "-c".to_string(), query.to_string()])
            .map_err(|e| dump_error(service, "credential lookup", e))?;
        let credential = String::from_utf8_lossy(&raw).trim().to_string();

        exec.stream(service, &self.dump_args(&credential), sink)
            .map_err(|e| dump_error(service, "dump", e))?;
        Ok(true)
    }
}

fn dump_error(service: &str, step: &str, err: AppError) -> AppError {
    match err {
        err @ AppError::Dump { .. } => err,
        other => AppError::Dump {
            service: service.to_string(),
            reason: format!("{} failed: {}", step, other),
        },
    }
}

/// Runs commands inside a named running service.
pub trait ContainerExec {
    /// Runs `args` and returns its standard output.
    fn capture(&self, service: &str, args: &[String]) -> Result<Vec<u8>>;

    /// Runs `args` with its standard output connected to `sink`.
    fn stream(&self, service: &str, args: &[String], sink: File) -> Result<()>;
}

/// `docker exec` against the compose service's container.
#[derive(Debug, Clone)]
pub struct DockerExec {
    docker: PathBuf,
}

impl DockerExec {
    pub fn new(docker: PathBuf) -> Self {
        Self { docker }
    }

    fn command(&self, service: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.docker);
        cmd.arg("exec").arg(service).args(args);
        cmd
    }
}

impl ContainerExec for DockerExec {
    fn capture(&self, service: &str, args: &[String]) -> Result<Vec<u8>> {
        Ok(run_checked(&mut self.command(service, args))?.stdout)
    }

    fn stream(&self, service: &str, args: &[String], sink: File) -> Result<()> {
        let output = self
            .command(service, args)
            .stdout(Stdio::from(sink))
            .stderr(Stdio::piped())
            .output()?;
        if !output.status.success() {
            // Only the tool name is reported, the arguments carry the credential.
            return Err(AppError::Command {
                command: format!("docker exec {} {}", service, args.first().map_or("", |a| a.as_str())),
                stderr: format!(
                    "exit status {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}
