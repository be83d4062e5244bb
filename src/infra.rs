use async_trait::async_trait;
use enrollment_core::config::SourceConfig;
use enrollment_core::enrollments::{
    CreatedAtInput, EnrollmentId, EnrollmentInput, EnrollmentSource, EnrollmentStatus,
    FileSource, SourceError, StaticSource,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The source the binary loads from: a file export when one is configured,
/// otherwise the built-in demo seed.
pub(crate) enum DeskSource {
    Demo(StaticSource),
    File(FileSource),
}

impl DeskSource {
    pub(crate) fn describe(&self) -> String {
        match self {
            DeskSource::Demo(_) => "demo seed".to_string(),
            DeskSource::File(source) => source.path().display().to_string(),
        }
    }
}

#[async_trait]
impl EnrollmentSource for DeskSource {
    type Error = SourceError;

    async fn fetch_all(&self) -> Result<Vec<EnrollmentInput>, Self::Error> {
        match self {
            DeskSource::Demo(source) => match source.fetch_all().await {
                Ok(records) => Ok(records),
                Err(never) => match never {},
            },
            DeskSource::File(source) => source.fetch_all().await,
        }
    }
}

pub(crate) fn resolve_source(config: &SourceConfig) -> Result<DeskSource, SourceError> {
    match &config.path {
        Some(path) => Ok(DeskSource::File(FileSource::from_path(path.clone())?)),
        None => Ok(DeskSource::Demo(StaticSource::new(demo_seed()))),
    }
}

pub(crate) fn demo_seed() -> Vec<EnrollmentInput> {
    vec![
        seed(
            "1",
            "Juan Perez",
            "juan@x.com",
            "Ceramics for Beginners",
            EnrollmentStatus::Confirmed,
            CreatedAtInput::Text("2025-03-01T10:00:00Z".to_string()),
        ),
        seed(
            "2",
            "Maria Garcia",
            "maria@x.com",
            "Watercolor Landscapes",
            EnrollmentStatus::Pending,
            CreatedAtInput::EpochMillis(1_740_909_600_000),
        ),
        seed(
            "3",
            "Lucia Fernandez",
            "lucia.fernandez@x.com",
            "Ceramics for Beginners",
            EnrollmentStatus::Pending,
            CreatedAtInput::Text("2025-03-03".to_string()),
        ),
        seed(
            "4",
            "Diego Morales",
            "dmorales@x.com",
            "Intro to Printmaking",
            EnrollmentStatus::Cancelled,
            CreatedAtInput::Text("2025-03-04T16:45:00-03:00".to_string()),
        ),
    ]
}

fn seed(
    id: &str,
    student_name: &str,
    email: &str,
    workshop: &str,
    status: EnrollmentStatus,
    created_at: CreatedAtInput,
) -> EnrollmentInput {
    EnrollmentInput {
        id: Some(EnrollmentId::from(id)),
        student_name: student_name.to_string(),
        email: email.to_string(),
        workshop: workshop.to_string(),
        status,
        created_at,
    }
}
