//! Derived status/search view over a store snapshot.
//!
//! [`filter`] is the pure query; [`FilteredView`] memoizes it so callers that
//! re-render on every request get the same output `Arc` back until the
//! snapshot or the query actually changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{Enrollment, EnrollmentStatus, StatusFilter};
use super::store::Records;

/// Query parameters accepted by the list endpoint and CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentQuery {
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub search: String,
}

/// Trims and lower-cases search text. Whitespace-only input becomes empty.
pub fn normalize_search(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Returns the records passing both the status and the search predicate, in
/// input order.
pub fn filter(records: &[Arc<Enrollment>], status: StatusFilter, search: &str) -> Records {
    filter_normalized(records, status, &normalize_search(search))
}

fn filter_normalized(records: &[Arc<Enrollment>], status: StatusFilter, needle: &str) -> Records {
    records
        .iter()
        .filter(|record| status.matches(record.status) && matches_search(record, needle))
        .cloned()
        .collect()
}

fn matches_search(record: &Enrollment, needle: &str) -> bool {
    needle.is_empty()
        || record.student_name.to_lowercase().contains(needle)
        || record.email.to_lowercase().contains(needle)
}

/// Memoized [`filter`].
#[derive(Debug, Default)]
pub struct FilteredView {
    cached: Option<CachedView>,
}

#[derive(Debug)]
struct CachedView {
    // holding the snapshot keeps its address from being reused
    source: Records,
    status: StatusFilter,
    needle: String,
    output: Records,
}

impl FilteredView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, records: &Records, status: StatusFilter, search: &str) -> Records {
        let needle = normalize_search(search);

        if let Some(cached) = &self.cached {
            if Arc::ptr_eq(&cached.source, records)
                && cached.status == status
                && cached.needle == needle
            {
                return Arc::clone(&cached.output);
            }
        }

        let output = filter_normalized(records, status, &needle);
        self.cached = Some(CachedView {
            source: Arc::clone(records),
            status,
            needle,
            output: Arc::clone(&output),
        });
        output
    }

    pub fn apply_query(&mut self, records: &Records, query: &EnrollmentQuery) -> Records {
        self.apply(records, query.status, &query.search)
    }
}

/// Per-status tallies shown next to the status tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn tally(records: &[Arc<Enrollment>]) -> Self {
        records
            .iter()
            .fold(Self::default(), |mut counts, record| {
                counts.all += 1;
                match record.status {
                    EnrollmentStatus::Pending => counts.pending += 1,
                    EnrollmentStatus::Confirmed => counts.confirmed += 1,
                    EnrollmentStatus::Cancelled => counts.cancelled += 1,
                }
                counts
            })
    }

    pub fn for_filter(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.all,
            StatusFilter::Pending => self.pending,
            StatusFilter::Confirmed => self.confirmed,
            StatusFilter::Cancelled => self.cancelled,
        }
    }
}
