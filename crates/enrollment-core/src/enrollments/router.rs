use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use super::domain::{EnrollmentId, EnrollmentInput};
use super::filter::{EnrollmentQuery, FilteredView, StatusCounts};
use super::source::EnrollmentSource;
use super::store::{EnrollmentStore, LoadFailure, Records};

/// Shared state behind the enrollment routes: the store plus the memoized
/// list view.
pub struct EnrollmentApi<S> {
    store: Arc<EnrollmentStore<S>>,
    view: Mutex<FilteredView>,
}

impl<S> EnrollmentApi<S>
where
    S: EnrollmentSource,
{
    pub fn new(store: Arc<EnrollmentStore<S>>) -> Self {
        Self {
            store,
            view: Mutex::new(FilteredView::new()),
        }
    }

    pub fn store(&self) -> &Arc<EnrollmentStore<S>> {
        &self.store
    }

    /// Filters the current snapshot through the memoized view.
    pub fn list(&self, query: &EnrollmentQuery) -> EnrollmentListView {
        let snapshot = self.store.snapshot();
        let records = self
            .view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply_query(&snapshot.records, query);

        EnrollmentListView {
            counts: StatusCounts::tally(&snapshot.records),
            matched: records.len(),
            records,
            is_loading: snapshot.is_loading,
            load_error: snapshot.load_error,
        }
    }
}

/// Payload of `GET /api/v1/enrollments`.
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentListView {
    pub records: Records,
    pub matched: usize,
    pub counts: StatusCounts,
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<LoadFailure>,
}

/// Router builder exposing list, create and confirm endpoints.
pub fn enrollment_router<S>(store: Arc<EnrollmentStore<S>>) -> Router
where
    S: EnrollmentSource + 'static,
{
    Router::new()
        .route(
            "/api/v1/enrollments",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route(
            "/api/v1/enrollments/:enrollment_id/confirm",
            post(confirm_handler::<S>),
        )
        .with_state(Arc::new(EnrollmentApi::new(store)))
}

pub(crate) async fn list_handler<S>(
    State(api): State<Arc<EnrollmentApi<S>>>,
    Query(query): Query<EnrollmentQuery>,
) -> Json<EnrollmentListView>
where
    S: EnrollmentSource + 'static,
{
    Json(api.list(&query))
}

pub(crate) async fn create_handler<S>(
    State(api): State<Arc<EnrollmentApi<S>>>,
    Json(input): Json<EnrollmentInput>,
) -> Response
where
    S: EnrollmentSource + 'static,
{
    let record = api.store.create(input);
    (StatusCode::CREATED, Json(record)).into_response()
}

pub(crate) async fn confirm_handler<S>(
    State(api): State<Arc<EnrollmentApi<S>>>,
    Path(enrollment_id): Path<String>,
) -> Response
where
    S: EnrollmentSource + 'static,
{
    let id = EnrollmentId(enrollment_id);
    let outcome = api.store.confirm(&id);

    match outcome.record() {
        Some(record) => {
            let payload = json!({
                "record": record,
                "changed": outcome.changed(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        None => {
            let payload = json!({
                "error": "enrollment not found",
                "id": id,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}
