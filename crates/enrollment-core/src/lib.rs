//! State and query engine behind the enrollment desk.
//!
//! [`enrollments::EnrollmentStore`] owns the canonical collection and its
//! loading lifecycle, [`enrollments::filter`] derives the status/search view
//! the presentation layer renders.

pub mod config;
pub mod enrollments;
pub mod error;
pub mod telemetry;
