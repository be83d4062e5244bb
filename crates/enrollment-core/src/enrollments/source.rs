use std::convert::Infallible;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer};

use super::domain::{EnrollmentId, EnrollmentInput, EnrollmentStatus};
use super::timestamp::CreatedAtInput;

/// Bulk read of enrollment records feeding [`super::EnrollmentStore::load`].
///
/// Sources hand back raw inputs; normalization is the store's job.
#[async_trait]
pub trait EnrollmentSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn fetch_all(&self) -> Result<Vec<EnrollmentInput>, Self::Error>;
}

/// Fixed in-memory list, used for the demo seed.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<EnrollmentInput>,
}

impl StaticSource {
    pub fn new(records: Vec<EnrollmentInput>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl EnrollmentSource for StaticSource {
    type Error = Infallible;

    async fn fetch_all(&self) -> Result<Vec<EnrollmentInput>, Self::Error> {
        Ok(self.records.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Csv,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Reads a JSON array or CSV export of enrollments from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: SourceFormat,
}

impl FileSource {
    /// Picks the format from the file extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();
        match SourceFormat::from_path(&path) {
            Some(format) => Ok(Self { path, format }),
            None => Err(SourceError::UnsupportedFormat(path)),
        }
    }

    pub fn with_format(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }
}

#[async_trait]
impl EnrollmentSource for FileSource {
    type Error = SourceError;

    async fn fetch_all(&self) -> Result<Vec<EnrollmentInput>, Self::Error> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;

        match self.format {
            SourceFormat::Json => Ok(serde_json::from_slice(&bytes)?),
            SourceFormat::Csv => Ok(parse_csv(bytes.as_slice())?),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read enrollment source {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid enrollment JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid enrollment CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unsupported enrollment source format for {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

pub(crate) fn parse_csv<R: Read>(reader: R) -> Result<Vec<EnrollmentInput>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for row in csv_reader.deserialize::<CsvRow>() {
        records.push(row?.into_input());
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "ID", default, deserialize_with = "empty_string_as_none")]
    id: Option<String>,
    #[serde(alias = "Student Name")]
    student_name: String,
    #[serde(alias = "Email")]
    email: String,
    #[serde(alias = "Workshop")]
    workshop: String,
    #[serde(alias = "Status", default, deserialize_with = "status_column")]
    status: Option<EnrollmentStatus>,
    #[serde(alias = "Created At")]
    created_at: String,
}

impl CsvRow {
    fn into_input(self) -> EnrollmentInput {
        EnrollmentInput {
            id: self.id.map(EnrollmentId),
            student_name: self.student_name,
            email: self.email,
            workshop: self.workshop,
            status: self.status.unwrap_or_default(),
            created_at: created_at_column(self.created_at),
        }
    }
}

/// Exports write either epoch milliseconds or a date string into the same
/// column.
fn created_at_column(value: String) -> CreatedAtInput {
    let digits = value.strip_prefix('-').unwrap_or(value.as_str());
    if !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()) {
        if let Ok(millis) = value.parse::<i64>() {
            return CreatedAtInput::EpochMillis(millis);
        }
    }
    CreatedAtInput::Text(value)
}

fn status_column<'de, D>(deserializer: D) -> Result<Option<EnrollmentStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    empty_string_as_none(deserializer)?
        .map(|value| value.parse::<EnrollmentStatus>().map_err(de::Error::custom))
        .transpose()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
