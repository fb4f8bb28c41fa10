//! Finalized-vehicle reporting: normalize raw rows, derive calendar buckets,
//! classify deadline compliance and produce the count tables behind the
//! dashboard charts.

/// Count and mean aggregates, filter context, selector helpers.
pub mod aggregate;
pub mod auth;
/// Calendar bucket keys.
pub mod bucket;
pub mod classify;
/// TOML settings and their validated forms.
pub mod config;
pub mod error;
pub mod normalize;
/// CSV/JSON exports and Markdown previews.
pub mod output;
/// Data-fetch collaborators.
pub mod source;
pub mod types;
pub mod util;

pub use aggregate::{
    aggregate, compliance_summary, date_range, default_month, distinct_values, mean_duration,
    mean_duration_days, DurationReference, FilterContext,
};
pub use auth::{AllowListAuthenticator, Authenticator, Credentials, UserIdentity};
pub use bucket::{bucket, iso_week_key, month_key, week_of_month};
pub use classify::classify;
pub use config::{
    ColumnMap, DateFormat, DefaultPeriod, NormalizerConfig, ReportConfig, SortOrder, SourceConfig,
};
pub use error::{AuthError, ReportError, SourceError};
pub use normalize::normalize;
pub use source::{CsvSource, JsonSource, RowSource};
pub use types::{
    AggregateRow, BucketKeys, ComplianceStatus, ComplianceSummary, GroupField, GroupValue,
    Measure, NormalizeReport, RawTable, RawValue, Record,
};
