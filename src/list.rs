use crate::infra::resolve_source;
use clap::Args;
use enrollment_core::config::AppConfig;
use enrollment_core::enrollments::{
    filter, Enrollment, EnrollmentId, EnrollmentStore, LoadOutcome, StatusCounts, StatusFilter,
};
use enrollment_core::error::AppError;
use enrollment_core::telemetry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    /// JSON or CSV export to read instead of ENROLLMENT_SOURCE
    #[arg(long)]
    pub(crate) source: Option<PathBuf>,
    /// all, pending, confirmed or cancelled
    #[arg(long, default_value = "all")]
    pub(crate) status: StatusFilter,
    /// Case-insensitive match against student name or email
    #[arg(long, default_value = "")]
    pub(crate) search: String,
    /// Confirm these enrollment ids before listing (repeatable)
    #[arg(long)]
    pub(crate) confirm: Vec<String>,
}

pub(crate) async fn run_list(args: ListArgs) -> Result<(), AppError> {
    let ListArgs {
        source,
        status,
        search,
        confirm,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(path) = source {
        config.source.path = Some(path);
    }
    telemetry::init(&config.telemetry)?;

    let source = resolve_source(&config.source)?;
    let label = source.describe();
    let store = EnrollmentStore::new(Arc::new(source));

    if let LoadOutcome::Failed(failure) = store.load().await {
        return Err(AppError::Load(failure));
    }

    for id in confirm {
        if !store.confirm_by_id(&EnrollmentId::new(id.as_str())) {
            warn!(id = %id, "no enrollment to confirm");
        }
    }

    let records = store.records();
    let visible = filter(&records, status, &search);
    let counts = StatusCounts::tally(&records);

    println!("Enrollments from {label}");
    println!(
        "Showing {} of {} ({}: {})",
        visible.len(),
        counts.all,
        status.label(),
        counts.for_filter(status)
    );
    for record in visible.iter() {
        println!("{}", render_row(record));
    }
    println!(
        "Pending {} | Confirmed {} | Cancelled {}",
        counts.pending, counts.confirmed, counts.cancelled
    );
    Ok(())
}

fn render_row(record: &Enrollment) -> String {
    format!(
        "- [{}] {:<10} {} <{}> | {} | {}",
        record.id,
        record.status.label(),
        record.student_name,
        record.email,
        record.workshop,
        record.created_at.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::demo_seed;
    use enrollment_core::enrollments::StaticSource;

    #[tokio::test]
    async fn rows_show_status_and_utc_timestamp() {
        let store = EnrollmentStore::new(Arc::new(StaticSource::new(demo_seed())));
        store.load().await;

        let maria = store
            .get(&EnrollmentId::from("2"))
            .expect("demo seed includes maria");
        let row = render_row(&maria);

        assert!(row.starts_with("- [2] pending"));
        assert!(row.contains("Maria Garcia <maria@x.com>"));
        assert!(row.ends_with("2025-03-02T10:00:00+00:00"));
    }
}
