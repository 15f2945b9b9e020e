use std::path::PathBuf;
use std::process::ExitStatus;

use gmns_ingest::IngestError;
use thiserror::Error;

/// Internal failure of a single check.
///
/// Never escapes the validator: it is turned into an ERROR result and the
/// run continues.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("failed to write {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failure to launch or complete the external assignment engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },

    #[error("in-process engine failed: {message}")]
    InProcess { message: String },
}

pub type Result<T> = std::result::Result<T, CheckError>;
