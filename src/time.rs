use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

// Offset-less forms are read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

use crate::error::{AppError, AppResult};
use crate::services::aggregation::DateRange;

/// `startDate`/`endDate` query pair shared by the aggregate endpoints.
#[derive(Debug, Clone, Default, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    /// RFC 3339 instant or `YYYY-MM-DD` (midnight UTC). Alias: `start`.
    #[serde(rename = "startDate", alias = "start")]
    pub start_date: Option<String>,
    /// RFC 3339 instant or `YYYY-MM-DD` (midnight UTC). Alias: `end`.
    #[serde(rename = "endDate", alias = "end")]
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    /// Both bounds are required. A reversed pair is kept as is and matches no samples.
    pub fn into_range(self) -> AppResult<DateRange> {
        let start = required_bound("startDate", self.start_date.as_deref())?;
        let end = required_bound("endDate", self.end_date.as_deref())?;
        Ok(DateRange::new(start, end))
    }
}

fn required_bound(name: &str, raw: Option<&str>) -> AppResult<DateTime<Utc>> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("{name} is required")))?;
    parse_ts(raw).ok_or_else(|| AppError::bad_request(format!("Invalid {name}: {raw}")))
}

/// Accepts ISO 8601 date-times with or without seconds, with `Z`, a `+HH:MM` offset or
/// no offset (UTC), and bare dates (midnight UTC).
pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = raw.strip_suffix(['Z', 'z']).unwrap_or(raw);
    if let Some(ts) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
    {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
