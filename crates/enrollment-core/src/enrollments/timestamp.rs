use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// `created_at` in any of the forms a source or a local create may supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedAtInput {
    Instant(DateTime<Utc>),
    EpochMillis(i64),
    Text(String),
}

impl CreatedAtInput {
    pub fn normalize(&self) -> Result<DateTime<Utc>, TimestampError> {
        normalize_created_at(self)
    }
}

impl From<DateTime<Utc>> for CreatedAtInput {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Instant(value)
    }
}

impl From<&str> for CreatedAtInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("'{0}' is not an ISO-8601 timestamp")]
    Unparsable(String),
    #[error("{0} ms is outside the representable range")]
    OutOfRange(i64),
}

/// Converts any accepted `created_at` form into the canonical UTC instant.
///
/// Normalizing an `Instant` returns it untouched, so the conversion is
/// idempotent.
pub fn normalize_created_at(input: &CreatedAtInput) -> Result<DateTime<Utc>, TimestampError> {
    match input {
        CreatedAtInput::Instant(instant) => Ok(*instant),
        CreatedAtInput::EpochMillis(millis) => Utc
            .timestamp_millis_opt(*millis)
            .single()
            .ok_or(TimestampError::OutOfRange(*millis)),
        CreatedAtInput::Text(raw) => {
            parse_timestamp(raw).ok_or_else(|| TimestampError::Unparsable(raw.clone()))
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // offset-less date-times are read as UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    None
}
