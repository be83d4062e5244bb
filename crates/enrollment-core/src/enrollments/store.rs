use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{Enrollment, EnrollmentId, EnrollmentInput, EnrollmentStatus};
use super::filter::StatusCounts;
use super::source::EnrollmentSource;

/// Immutable snapshot of the collection. Every state change swaps in a new
/// slice; records that did not change keep their `Arc`.
pub type Records = Arc<[Arc<Enrollment>]>;

pub const LOAD_FAILURE_FALLBACK: &str = "failed to load enrollments";

/// Normalized description of a failed load. The message is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    message: String,
}

impl LoadFailure {
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let trimmed = message.trim();
        if trimmed.is_empty() {
            Self {
                message: LOAD_FAILURE_FALLBACK.to_string(),
            }
        } else {
            Self {
                message: trimmed.to_string(),
            }
        }
    }

    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::from_message(error.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LoadFailure {}

/// What a call to [`EnrollmentStore::load`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    Failed(LoadFailure),
    /// Another load of the same store had not settled yet; nothing changed.
    AlreadyInFlight,
}

/// Result of [`EnrollmentStore::confirm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed(Arc<Enrollment>),
    /// The record exists but was not pending.
    Unchanged(Arc<Enrollment>),
    NotFound,
}

impl ConfirmOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn record(&self) -> Option<&Arc<Enrollment>> {
        match self {
            Self::Confirmed(record) | Self::Unchanged(record) => Some(record),
            Self::NotFound => None,
        }
    }
}

/// Time source for `created_at` fallbacks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Consistent view of everything the presentation layer reads.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub records: Records,
    pub is_loading: bool,
    pub load_error: Option<LoadFailure>,
}

struct StoreState {
    records: Records,
    is_loading: bool,
    load_error: Option<LoadFailure>,
    sequence: IdSequence,
}

/// Per-store generator for ids the caller did not (uniquely) supply.
#[derive(Debug, Default)]
struct IdSequence {
    last: u64,
}

impl IdSequence {
    fn next_free(&mut self, taken: impl Fn(&EnrollmentId) -> bool) -> EnrollmentId {
        loop {
            self.last += 1;
            let candidate = EnrollmentId(format!("enr-{:06}", self.last));
            if !taken(&candidate) {
                return candidate;
            }
        }
    }
}

/// Single source of truth for the enrollment collection and its loading
/// lifecycle.
pub struct EnrollmentStore<S> {
    source: Arc<S>,
    clock: Arc<dyn Clock>,
    state: RwLock<StoreState>,
}

impl<S> EnrollmentStore<S>
where
    S: EnrollmentSource,
{
    pub fn new(source: Arc<S>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            state: RwLock::new(StoreState {
                records: Arc::from(Vec::new()),
                is_loading: false,
                load_error: None,
                sequence: IdSequence::default(),
            }),
        }
    }

    pub fn records(&self) -> Records {
        Arc::clone(&self.read_state().records)
    }

    pub fn is_loading(&self) -> bool {
        self.read_state().is_loading
    }

    pub fn load_error(&self) -> Option<LoadFailure> {
        self.read_state().load_error.clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read_state();
        StoreSnapshot {
            records: Arc::clone(&state.records),
            is_loading: state.is_loading,
            load_error: state.load_error.clone(),
        }
    }

    pub fn get(&self, id: &EnrollmentId) -> Option<Arc<Enrollment>> {
        self.read_state()
            .records
            .iter()
            .find(|record| &record.id == id)
            .cloned()
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.records())
    }

    /// Fetches every record from the source and replaces the collection.
    ///
    /// A second call while one is still in flight returns
    /// [`LoadOutcome::AlreadyInFlight`] without touching state. `is_loading`
    /// is cleared when the read settles, and also if this future is dropped
    /// before it does.
    pub async fn load(&self) -> LoadOutcome {
        let Some(loading) = self.begin_load() else {
            debug!("enrollment load already in flight; ignoring");
            return LoadOutcome::AlreadyInFlight;
        };

        let fetched = self.source.fetch_all().await;

        loading.settle(|state| {
            let result = match fetched {
                Ok(inputs) => build_collection(inputs, &mut state.sequence),
                Err(error) => Err(LoadFailure::from_error(&error)),
            };

            match result {
                Ok(records) => {
                    let count = records.len();
                    state.records = records.into();
                    info!(count, "enrollments loaded");
                    LoadOutcome::Loaded { count }
                }
                Err(failure) => {
                    warn!(error = %failure, "enrollment load failed");
                    state.load_error = Some(failure.clone());
                    LoadOutcome::Failed(failure)
                }
            }
        })
    }

    /// Appends a record. Never fails: an id that is missing or already held
    /// is replaced with a generated one, and an unparsable `created_at` falls
    /// back to the store clock.
    pub fn create(&self, input: EnrollmentInput) -> Arc<Enrollment> {
        let created_at = match input.created_at.normalize() {
            Ok(instant) => instant,
            Err(error) => {
                let now = self.clock.now();
                warn!(%error, fallback = %now, "created_at could not be normalized");
                now
            }
        };

        let mut state = self.write_state();
        let records = Arc::clone(&state.records);
        let taken = |id: &EnrollmentId| records.iter().any(|record| &record.id == id);

        let id = match input.id {
            Some(requested) if !taken(&requested) => requested,
            Some(requested) => {
                let assigned = state.sequence.next_free(taken);
                warn!(
                    %requested,
                    %assigned,
                    "enrollment id already in use; assigned a new one"
                );
                assigned
            }
            None => state.sequence.next_free(taken),
        };

        let record = Arc::new(Enrollment {
            id,
            student_name: input.student_name,
            email: input.email,
            workshop: input.workshop,
            status: input.status,
            created_at,
        });

        state.records = records
            .iter()
            .cloned()
            .chain(std::iter::once(Arc::clone(&record)))
            .collect();

        info!(id = %record.id, workshop = %record.workshop, "enrollment created");
        record
    }

    /// Moves a pending record to confirmed. Returns whether anything changed;
    /// unknown ids and non-pending records leave the snapshot untouched.
    pub fn confirm_by_id(&self, id: &EnrollmentId) -> bool {
        self.confirm(id).changed()
    }

    /// Same transition as [`EnrollmentStore::confirm_by_id`], reporting the
    /// record as it stands once the write lock is released.
    pub fn confirm(&self, id: &EnrollmentId) -> ConfirmOutcome {
        let mut state = self.write_state();

        let Some(index) = state.records.iter().position(|record| &record.id == id) else {
            debug!(%id, "confirm ignored: unknown enrollment");
            return ConfirmOutcome::NotFound;
        };

        let current = Arc::clone(&state.records[index]);
        if current.status != EnrollmentStatus::Pending {
            debug!(%id, status = current.status.label(), "confirm ignored: not pending");
            return ConfirmOutcome::Unchanged(current);
        }

        let confirmed = Arc::new(current.with_status(EnrollmentStatus::Confirmed));
        let next: Records = state
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                if position == index {
                    Arc::clone(&confirmed)
                } else {
                    Arc::clone(record)
                }
            })
            .collect();
        state.records = next;

        info!(%id, "enrollment confirmed");
        ConfirmOutcome::Confirmed(confirmed)
    }

    fn begin_load(&self) -> Option<LoadingGuard<'_>> {
        let mut state = self.write_state();
        if state.is_loading {
            return None;
        }
        state.is_loading = true;
        state.load_error = None;
        Some(LoadingGuard {
            state: &self.state,
            armed: true,
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        // every write swaps whole values, so a poisoned lock still holds a
        // consistent state
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears `is_loading` exactly once, either through [`LoadingGuard::settle`]
/// or on drop.
struct LoadingGuard<'a> {
    state: &'a RwLock<StoreState>,
    armed: bool,
}

impl LoadingGuard<'_> {
    fn settle<T>(mut self, update: impl FnOnce(&mut StoreState) -> T) -> T {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let result = update(&mut state);
        state.is_loading = false;
        self.armed = false;
        result
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.is_loading = false;
        }
    }
}

fn build_collection(
    inputs: Vec<EnrollmentInput>,
    sequence: &mut IdSequence,
) -> Result<Vec<Arc<Enrollment>>, LoadFailure> {
    let supplied: HashSet<EnrollmentId> = inputs
        .iter()
        .filter_map(|input| input.id.clone())
        .collect();
    let mut seen: HashSet<EnrollmentId> = HashSet::with_capacity(inputs.len());
    let mut records = Vec::with_capacity(inputs.len());

    for input in inputs {
        let created_at = input.created_at.normalize().map_err(|error| {
            let label = input
                .id
                .as_ref()
                .map(EnrollmentId::to_string)
                .unwrap_or_else(|| input.student_name.clone());
            LoadFailure::from_message(format!(
                "enrollment {label} has an invalid created_at: {error}"
            ))
        })?;

        let id = match input.id {
            Some(id) if !seen.contains(&id) => id,
            other => {
                let assigned = sequence.next_free(|candidate| {
                    supplied.contains(candidate) || seen.contains(candidate)
                });
                if let Some(duplicate) = other {
                    warn!(
                        %duplicate,
                        %assigned,
                        "duplicate enrollment id in source; assigned a new one"
                    );
                }
                assigned
            }
        };
        seen.insert(id.clone());

        records.push(Arc::new(Enrollment {
            id,
            student_name: input.student_name,
            email: input.email,
            workshop: input.workshop,
            status: input.status,
            created_at,
        }));
    }

    Ok(records)
}
