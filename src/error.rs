use std::io;

use thiserror::Error;

/// Errors raised by the normalize/aggregate pipeline, its configuration and
/// the report writers.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("required column '{column}' not found in dataset")]
    MissingColumn { column: String },
    #[error("ambiguous date format: {reason}")]
    AmbiguousDateFormat { reason: String },
    #[error("no data available for {what}")]
    NoData { what: String },
    #[error("configuration error: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures of a data-fetch collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed CSV in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("malformed JSON row set in '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("row set '{path}' is malformed: {details}")]
    Malformed { path: String, details: String },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user '{username}' is not allowed to load report data")]
    Rejected { username: String },
    #[error("no user identity could be determined")]
    MissingIdentity,
}
