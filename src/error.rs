use std::path::PathBuf;

use thiserror::Error;

/// Typed failures surfaced to the operator. Downcast from `anyhow::Error`
/// in `main` to pick the exit code and message.
#[derive(Debug, Error)]
pub enum OpsError {
    #[error("file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("invalid value '{value}' for --{flag}: expected true or false")]
    InvalidFlag { flag: &'static str, value: String },

    #[error("connection to {host} failed: {reason}")]
    Connection { host: String, reason: String },

    #[error("rendering config for {device} failed: {reason}")]
    Render { device: String, reason: String },

    #[error("writing {} failed: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading {} failed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("credentials unavailable: {0}")]
    Credentials(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl OpsError {
    pub fn connection(host: &str, reason: impl std::fmt::Display) -> Self {
        Self::Connection {
            host: host.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn render(device: &str, reason: impl std::fmt::Display) -> Self {
        Self::Render {
            device: device.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Map an io error on `path` to `MissingFile` when the file is absent
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingFile { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidFlag { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = OpsError::from_io(
            "csv_data/missing.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, OpsError::MissingFile { .. }));
        assert_eq!(err.to_string(), "file not found: csv_data/missing.csv");
    }

    #[test]
    fn test_exit_codes() {
        let flag = OpsError::InvalidFlag { flag: "dryrun", value: "maybe".into() };
        assert_eq!(flag.exit_code(), 2);
        assert_eq!(OpsError::connection("sw1", "timeout").exit_code(), 1);
    }
}
