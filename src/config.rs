use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReportError;
use crate::types::GroupField;

/// Day-first timestamp layout of the vehicle CSV export (`25/03/2024 14:05`).
pub const DAY_FIRST_WITH_TIME: &str = "%d/%m/%Y %H:%M";

const DAY_TOKENS: &[&str] = &["%d", "%e", "%-d", "%j"];
const MONTH_TOKENS: &[&str] = &["%m", "%-m", "%b", "%B", "%h", "%j"];
const YEAR_TOKENS: &[&str] = &["%Y", "%y", "%G"];
const FULL_DATE_TOKENS: &[&str] = &["%F", "%D", "%x", "%c"];
const TIME_TOKENS: &[&str] = &[
    "%H", "%-H", "%k", "%I", "%l", "%M", "%S", "%T", "%R", "%X", "%p", "%P", "%c",
];

fn is_time_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, 'T' | ',' | '-' | ':' | '.')
}

/// Cut the span from the first to the last time token out of `pattern`,
/// with the separators that joined it to the date. `%Y-%m-%dT%H:%M:%S`
/// gives `%Y-%m-%d`; `%H:%M %d/%m/%Y` gives `%d/%m/%Y`.
fn strip_time(pattern: &str) -> String {
    let mut span: Option<(usize, usize)> = None;
    for token in TIME_TOKENS {
        for (at, _) in pattern.match_indices(token) {
            let end = at + token.len();
            span = Some(match span {
                Some((start, stop)) => (start.min(at), stop.max(end)),
                None => (at, end),
            });
        }
    }
    let Some((start, end)) = span else {
        return pattern.to_string();
    };
    let head = pattern[..start].trim_end_matches(is_time_separator);
    let tail = pattern[end..].trim_start_matches(is_time_separator);
    match (head.is_empty(), tail.is_empty()) {
        (_, true) => head.to_string(),
        (true, false) => tail.to_string(),
        (false, false) => format!("{head} {tail}"),
    }
}

/// An explicit, validated strptime-style pattern.
///
/// The pattern decides day-first versus month-first; nothing is inferred
/// from the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    date_part: String,
    has_time: bool,
}

impl DateFormat {
    pub fn new(pattern: &str) -> Result<Self, ReportError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(ReportError::AmbiguousDateFormat {
                reason: "no date format given".to_string(),
            });
        }
        let contains = |tokens: &[&str]| tokens.iter().any(|t| pattern.contains(t));
        if !contains(FULL_DATE_TOKENS) {
            let required = [
                ("day", DAY_TOKENS),
                ("month", MONTH_TOKENS),
                ("year", YEAR_TOKENS),
            ];
            for (name, tokens) in required {
                if !contains(tokens) {
                    return Err(ReportError::AmbiguousDateFormat {
                        reason: format!("pattern '{}' has no {} component", pattern, name),
                    });
                }
            }
        }
        let has_time = contains(TIME_TOKENS);
        let date_part = if has_time {
            strip_time(pattern)
        } else {
            pattern.to_string()
        };
        Ok(Self {
            pattern: pattern.to_string(),
            date_part,
            has_time,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn has_time(&self) -> bool {
        self.has_time
    }

    /// The pattern with its time-of-day portion removed.
    pub fn date_part(&self) -> &str {
        &self.date_part
    }
}

/// External column names mapped onto the record fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub brand: String,
    pub model: String,
    pub completion_date: String,
    pub contract_date: String,
    pub allowed_days: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            brand: "Marca".to_string(),
            model: "Modelo".to_string(),
            completion_date: "Datafinalizacao".to_string(),
            contract_date: "Datacontrato".to_string(),
            allowed_days: "Prazo".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// First-seen order of each key combination.
    #[default]
    None,
    /// Ascending by key tuple.
    ByKey,
    /// Descending by measure; ties keep first-seen order.
    ByCount,
}

/// Which month a month-scoped view starts on when the user picked none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPeriod {
    #[default]
    None,
    CurrentMonth,
    MostRecent,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Csv {
        path: PathBuf,
        #[serde(default = "default_delimiter")]
        delimiter: String,
    },
    Json {
        path: PathBuf,
    },
}

fn default_delimiter() -> String {
    ";".to_string()
}

impl SourceConfig {
    /// Pick a source kind from the file extension; anything that is not
    /// `.json` reads as a `;`-delimited CSV.
    pub fn infer(path: &Path) -> Self {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            SourceConfig::Json {
                path: path.to_path_buf(),
            }
        } else {
            SourceConfig::Csv {
                path: path.to_path_buf(),
                delimiter: default_delimiter(),
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SourceConfig::Csv { path, .. } | SourceConfig::Json { path } => path,
        }
    }

    /// Same kind and delimiter, different file.
    pub fn with_path(&self, new_path: &Path) -> Self {
        match self {
            SourceConfig::Csv { delimiter, .. } => SourceConfig::Csv {
                path: new_path.to_path_buf(),
                delimiter: delimiter.clone(),
            },
            SourceConfig::Json { .. } => SourceConfig::Json {
                path: new_path.to_path_buf(),
            },
        }
    }

    pub fn delimiter_byte(&self) -> Result<u8, ReportError> {
        match self {
            SourceConfig::Csv { delimiter, .. } => match delimiter.as_bytes() {
                [b] if b.is_ascii() => Ok(*b),
                _ => Err(ReportError::InvalidConfig(format!(
                    "CSV delimiter must be a single ASCII character, got '{}'",
                    delimiter
                ))),
            },
            SourceConfig::Json { .. } => Ok(b','),
        }
    }
}

/// Settings consumed by the row normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub columns: ColumnMap,
    pub date_format: DateFormat,
}

impl NormalizerConfig {
    pub fn new(date_format: DateFormat) -> Self {
        Self {
            columns: ColumnMap::default(),
            date_format,
        }
    }

    pub fn with_columns(mut self, columns: ColumnMap) -> Self {
        self.columns = columns;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawReportConfig {
    date_format: Option<String>,
    #[serde(default)]
    columns: ColumnMap,
    #[serde(default)]
    group_by: Vec<GroupField>,
    #[serde(default)]
    sort: SortOrder,
    #[serde(default)]
    default_period: DefaultPeriod,
    #[serde(default)]
    allowed_users: Vec<String>,
    source: Option<SourceConfig>,
}

/// Validated report settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub normalizer: NormalizerConfig,
    pub group_by: Vec<GroupField>,
    pub sort: SortOrder,
    pub default_period: DefaultPeriod,
    pub allowed_users: Vec<String>,
    pub source: Option<SourceConfig>,
}

impl ReportConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ReportError> {
        let raw: RawReportConfig = toml::from_str(text)?;
        let date_format = DateFormat::new(raw.date_format.as_deref().unwrap_or_default())?;
        if let Some(source) = &raw.source {
            source.delimiter_byte()?;
        }
        let group_by = if raw.group_by.is_empty() {
            vec![GroupField::MonthKey]
        } else {
            raw.group_by
        };
        Ok(Self {
            normalizer: NormalizerConfig::new(date_format).with_columns(raw.columns),
            group_by,
            sort: raw.sort,
            default_period: raw.default_period,
            allowed_users: raw.allowed_users,
            source: raw.source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
