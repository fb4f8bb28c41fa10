use std::fs;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::{debug, info, warn};

use crate::auth::UserIdentity;
use crate::config::SourceConfig;
use crate::error::{ReportError, SourceError};
use crate::types::{RawTable, RawValue};

/// Producer of raw row sets. Every fetch names the authenticated user it
/// serves.
pub trait RowSource {
    fn fetch(&self, user: &UserIdentity) -> Result<RawTable, SourceError>;
}

/// Delimited text export. Headers are trimmed, blank cells read as null and
/// rows may be shorter or longer than the header; fields past the header
/// width are dropped. Bytes that are not valid UTF-8 are replaced, never
/// rejected.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b';',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

impl RowSource for CsvSource {
    fn fetch(&self, user: &UserIdentity) -> Result<RawTable, SourceError> {
        info!(user = user.username(), path = %self.path.display(), "loading CSV row set");
        let csv_err = |source| SourceError::Csv {
            path: self.path_str(),
            source,
        };
        let mut rdr = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(&self.path)
            .map_err(csv_err)?;
        // Exports are not always UTF-8; invalid bytes become U+FFFD so the
        // row still reaches the normalizer and is counted there.
        let columns: Vec<String> = rdr
            .byte_headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();
        let width = columns.len();
        let mut table = RawTable::new(columns);
        let mut truncated = 0usize;

        for result in rdr.byte_records() {
            let record = result.map_err(csv_err)?;
            if record.len() > width {
                truncated += 1;
            }
            let row: Vec<RawValue> = record
                .iter()
                .take(width)
                .map(|field| {
                    let field = String::from_utf8_lossy(field);
                    if field.trim().is_empty() {
                        RawValue::Null
                    } else {
                        RawValue::Text(field.into_owned())
                    }
                })
                .collect();
            table.rows.push(row);
        }
        if truncated > 0 {
            warn!(
                truncated,
                width,
                path = %self.path.display(),
                "CSV rows had more fields than the header; extra fields dropped"
            );
        }
        debug!(rows = table.rows.len(), "CSV row set loaded");
        Ok(table)
    }
}

/// JSON export of the analytics query service:
/// `{ "columns": [...], "rows": [[...], ...] }`.
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
}

impl JsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RowSource for JsonSource {
    fn fetch(&self, user: &UserIdentity) -> Result<RawTable, SourceError> {
        info!(user = user.username(), path = %self.path.display(), "loading JSON row set");
        let path = self.path.display().to_string();
        let text = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let table: RawTable = serde_json::from_str(&text).map_err(|source| SourceError::Json {
            path: path.clone(),
            source,
        })?;
        if table.columns.is_empty() && !table.rows.is_empty() {
            return Err(SourceError::Malformed {
                path,
                details: "rows present but no columns declared".to_string(),
            });
        }
        debug!(rows = table.rows.len(), "JSON row set loaded");
        Ok(table)
    }
}

impl SourceConfig {
    /// Build the configured collaborator.
    pub fn open(&self) -> Result<Box<dyn RowSource>, ReportError> {
        Ok(match self {
            SourceConfig::Csv { path, .. } => {
                Box::new(CsvSource::new(path.clone()).with_delimiter(self.delimiter_byte()?))
            }
            SourceConfig::Json { path } => Box::new(JsonSource::new(path.clone())),
        })
    }
}

/// Convenience for callers that only have a path.
pub fn open_path(path: &Path) -> Result<Box<dyn RowSource>, ReportError> {
    SourceConfig::infer(path).open()
}
