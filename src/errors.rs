use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service manifest error: {0}")]
    Manifest(String),

    #[error("Dump of service '{service}' failed: {reason}")]
    Dump { service: String, reason: String },

    #[error("Command `{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("Remote storage error: {0}")]
    Remote(String),

    #[error("Remote delete failed: {0}")]
    RemoteDelete(String),

    #[error("did not find any available backups")]
    NoBackupsFound,

    #[error("Invalid selection '{input}': expected an index in [0, {count})")]
    InvalidSelection { input: String, count: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
