//! Enrollment records: loading, local mutation and the filtered view.

pub mod domain;
pub mod filter;
pub mod router;
pub mod source;
pub mod store;
pub mod timestamp;

#[cfg(test)]
mod tests;

pub use domain::{
    Enrollment, EnrollmentId, EnrollmentInput, EnrollmentStatus, StatusFilter,
    UnknownEnrollmentStatus, UnknownStatusFilter,
};
pub use filter::{filter, normalize_search, EnrollmentQuery, FilteredView, StatusCounts};
pub use router::enrollment_router;
pub use source::{EnrollmentSource, FileSource, SourceError, SourceFormat, StaticSource};
pub use store::{
    Clock, ConfirmOutcome, EnrollmentStore, LoadFailure, LoadOutcome, Records, StoreSnapshot,
    SystemClock, LOAD_FAILURE_FALLBACK,
};
pub use timestamp::{normalize_created_at, CreatedAtInput, TimestampError};
