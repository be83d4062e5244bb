use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::enrollments::domain::{Enrollment, EnrollmentId, EnrollmentInput, EnrollmentStatus};
use crate::enrollments::source::{EnrollmentSource, StaticSource};
use crate::enrollments::store::{Clock, EnrollmentStore};
use crate::enrollments::timestamp::CreatedAtInput;

pub(super) fn instant(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn input(
    id: Option<&str>,
    student_name: &str,
    email: &str,
    status: EnrollmentStatus,
) -> EnrollmentInput {
    EnrollmentInput {
        id: id.map(EnrollmentId::from),
        student_name: student_name.to_string(),
        email: email.to_string(),
        workshop: "Ceramics".to_string(),
        status,
        created_at: CreatedAtInput::Text("2025-03-01T10:00:00Z".to_string()),
    }
}

pub(super) fn juan() -> EnrollmentInput {
    input(
        Some("1"),
        "Juan Perez",
        "juan@x.com",
        EnrollmentStatus::Confirmed,
    )
}

pub(super) fn maria() -> EnrollmentInput {
    EnrollmentInput {
        workshop: "Painting".to_string(),
        created_at: CreatedAtInput::EpochMillis(1_740_909_600_000),
        ..input(
            Some("2"),
            "Maria Garcia",
            "maria@x.com",
            EnrollmentStatus::Pending,
        )
    }
}

pub(super) fn seeded_source() -> Arc<StaticSource> {
    Arc::new(StaticSource::new(vec![juan(), maria()]))
}

pub(super) async fn loaded_store() -> EnrollmentStore<StaticSource> {
    let store = EnrollmentStore::new(seeded_source());
    store.load().await;
    store
}

pub(super) fn ids(records: &[Arc<Enrollment>]) -> Vec<&str> {
    records.iter().map(|record| record.id.as_str()).collect()
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(super) struct UpstreamError(pub(super) String);

/// Rejects every read with the given message.
pub(super) struct FailingSource {
    message: String,
}

impl FailingSource {
    pub(super) fn new(message: &str) -> Arc<Self> {
        Arc::new(Self {
            message: message.to_string(),
        })
    }
}

#[async_trait]
impl EnrollmentSource for FailingSource {
    type Error = UpstreamError;

    async fn fetch_all(&self) -> Result<Vec<EnrollmentInput>, Self::Error> {
        Err(UpstreamError(self.message.clone()))
    }
}

/// Fails the first read, then serves its records.
pub(super) struct FlakySource {
    attempts: AtomicUsize,
    records: Vec<EnrollmentInput>,
}

impl FlakySource {
    pub(super) fn new(records: Vec<EnrollmentInput>) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            records,
        })
    }
}

#[async_trait]
impl EnrollmentSource for FlakySource {
    type Error = UpstreamError;

    async fn fetch_all(&self) -> Result<Vec<EnrollmentInput>, Self::Error> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(UpstreamError("connection reset".to_string()));
        }
        Ok(self.records.clone())
    }
}

/// Holds every read until [`GatedSource::release`] is called.
pub(super) struct GatedSource {
    gate: Notify,
    calls: AtomicUsize,
    records: Vec<EnrollmentInput>,
}

impl GatedSource {
    pub(super) fn new(records: Vec<EnrollmentInput>) -> Arc<Self> {
        Arc::new(Self {
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
            records,
        })
    }

    pub(super) fn release(&self) {
        self.gate.notify_one();
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrollmentSource for GatedSource {
    type Error = UpstreamError;

    async fn fetch_all(&self) -> Result<Vec<EnrollmentInput>, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(self.records.clone())
    }
}

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
