use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Failures while composing a backend invocation.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid container spec: {0}")]
    InvalidSpec(anyhow::Error),

    #[error("failed to resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("failed to serialize pod overrides: {0}")]
    Overrides(#[from] serde_json::Error),
}

/// Failures while exchanging documents with the spawned process.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to exchange documents with '{path}' (workdir {working_dir:?}): {source}")]
    Stdio {
        path: String,
        working_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' exited with {status}: {stderr}")]
    NonZeroExit {
        path: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("malformed document stream: {0}")]
    Codec(#[from] serde_yaml::Error),
}

/// Combined error surface of [`crate::ContainerFilter`].
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
