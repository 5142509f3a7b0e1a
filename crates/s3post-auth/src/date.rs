//! Date encodings used by POST policy signing.
//!
//! Three renderings of one instant are needed:
//!
//! | Format | Example | Used for |
//! |--------|---------|----------|
//! | [`DateFormat::Iso8601`] | `2017-03-31T20:43:47.314Z` | policy `expiration` |
//! | [`DateFormat::Yyyymmdd`] | `20170331` | credential scope, signing key |
//! | [`DateFormat::AmzIso8601`] | `20170331T000000Z` | `X-Amz-Date` |
//!
//! The AMZ form always carries a zeroed time of day; only the expiration keeps
//! full precision.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

/// Suffix appended to the compact date to form the AMZ date.
const AMZ_TIME_SUFFIX: &str = "T000000Z";

/// The string encodings a timestamp can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateFormat {
    /// Full ISO-8601 with millisecond precision and a `Z` suffix.
    #[default]
    Iso8601,
    /// Compact calendar date, `YYYYMMDD`.
    Yyyymmdd,
    /// Compact calendar date followed by `T000000Z`.
    AmzIso8601,
}

impl DateFormat {
    /// The canonical name of this format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iso8601 => "iso8601",
            Self::Yyyymmdd => "yyyymmdd",
            Self::AmzIso8601 => "amz-iso8601",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a date format name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDateFormat(pub String);

impl fmt::Display for UnknownDateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown date format: {}", self.0)
    }
}

impl std::error::Error for UnknownDateFormat {}

impl FromStr for DateFormat {
    type Err = UnknownDateFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iso8601" => Ok(Self::Iso8601),
            "yyyymmdd" => Ok(Self::Yyyymmdd),
            "amz-iso8601" => Ok(Self::AmzIso8601),
            other => Err(UnknownDateFormat(other.to_owned())),
        }
    }
}

/// Render `date` in the requested format.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use s3post_auth::date::{DateFormat, format_date};
///
/// let date = Utc.timestamp_millis_opt(1_490_993_027_314).unwrap();
/// assert_eq!(format_date(&date, DateFormat::Iso8601), "2017-03-31T20:43:47.314Z");
/// assert_eq!(format_date(&date, DateFormat::Yyyymmdd), "20170331");
/// assert_eq!(format_date(&date, DateFormat::AmzIso8601), "20170331T000000Z");
/// ```
#[must_use]
pub fn format_date(date: &DateTime<Utc>, format: DateFormat) -> String {
    match format {
        DateFormat::Iso8601 => date.to_rfc3339_opts(SecondsFormat::Millis, true),
        DateFormat::Yyyymmdd => date.format("%Y%m%d").to_string(),
        DateFormat::AmzIso8601 => {
            let mut amz = format_date(date, DateFormat::Yyyymmdd);
            amz.push_str(AMZ_TIME_SUFFIX);
            amz
        }
    }
}
