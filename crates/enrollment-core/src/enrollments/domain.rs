use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp::CreatedAtInput;

/// Identifier wrapper for enrollment records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(pub String);

impl EnrollmentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnrollmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle stage of an enrollment.
///
/// Only `Pending -> Confirmed` is reachable through the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl EnrollmentStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Confirmed, Self::Cancelled]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown enrollment status '{0}' (expected pending, confirmed or cancelled)")]
pub struct UnknownEnrollmentStatus(pub String);

impl FromStr for EnrollmentStatus {
    type Err = UnknownEnrollmentStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(UnknownEnrollmentStatus(value.to_string())),
        }
    }
}

/// A single student/workshop registration as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_name: String,
    pub email: String,
    pub workshop: String,
    pub status: EnrollmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    pub(crate) fn with_status(&self, status: EnrollmentStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Enrollment as supplied by a source or a local create, before the store
/// has assigned an id or normalized `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EnrollmentId>,
    pub student_name: String,
    pub email: String,
    pub workshop: String,
    #[serde(default)]
    pub status: EnrollmentStatus,
    pub created_at: CreatedAtInput,
}

/// Status predicate used by the filter engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Confirmed,
    Cancelled,
}

impl StatusFilter {
    pub const fn matches(self, status: EnrollmentStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => matches!(status, EnrollmentStatus::Pending),
            Self::Confirmed => matches!(status, EnrollmentStatus::Confirmed),
            Self::Cancelled => matches!(status, EnrollmentStatus::Cancelled),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<EnrollmentStatus> for StatusFilter {
    fn from(status: EnrollmentStatus) -> Self {
        match status {
            EnrollmentStatus::Pending => Self::Pending,
            EnrollmentStatus::Confirmed => Self::Confirmed,
            EnrollmentStatus::Cancelled => Self::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status filter '{0}' (expected all, pending, confirmed or cancelled)")]
pub struct UnknownStatusFilter(pub String);

impl FromStr for StatusFilter {
    type Err = UnknownStatusFilter;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatusFilter(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parses_case_insensitively() {
        assert_eq!("ALL".parse::<StatusFilter>(), Ok(StatusFilter::All));
        assert_eq!(" Pending ".parse::<StatusFilter>(), Ok(StatusFilter::Pending));
        assert_eq!("canceled".parse::<StatusFilter>(), Ok(StatusFilter::Cancelled));
        assert!("archived".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn enrollment_status_rejects_unknown_values() {
        assert_eq!(
            " Confirmed ".parse::<EnrollmentStatus>(),
            Ok(EnrollmentStatus::Confirmed)
        );
        assert_eq!(
            "canceled".parse::<EnrollmentStatus>(),
            Ok(EnrollmentStatus::Cancelled)
        );
        assert_eq!(
            "confirmd".parse::<EnrollmentStatus>(),
            Err(UnknownEnrollmentStatus("confirmd".to_string()))
        );
        assert!("all".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn all_filter_matches_every_status() {
        for status in EnrollmentStatus::ordered() {
            assert!(StatusFilter::All.matches(status));
            assert!(StatusFilter::from(status).matches(status));
        }
        assert!(!StatusFilter::Pending.matches(EnrollmentStatus::Confirmed));
    }

    #[test]
    fn input_defaults_to_pending_without_id() {
        let input: EnrollmentInput = serde_json::from_str(
            r#"{"student_name":"Ana Ruiz","email":"ana@x.com","workshop":"Pottery","created_at":"2025-03-01"}"#,
        )
        .expect("input parses");
        assert!(input.id.is_none());
        assert_eq!(input.status, EnrollmentStatus::Pending);
    }
}
