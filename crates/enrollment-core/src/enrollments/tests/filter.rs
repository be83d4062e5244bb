use super::common::*;
use crate::enrollments::domain::{EnrollmentStatus, StatusFilter};
use crate::enrollments::filter::{filter, EnrollmentQuery, FilteredView, StatusCounts};
use crate::enrollments::store::Records;
use std::sync::Arc;

async fn juan_and_maria() -> Records {
    loaded_store().await.records()
}

fn is_ordered_subsequence(output: &Records, input: &Records) -> bool {
    let mut remaining = input.iter();
    output
        .iter()
        .all(|wanted| remaining.any(|candidate| Arc::ptr_eq(candidate, wanted)))
}

#[tokio::test]
async fn search_matches_student_name_case_insensitively() {
    let records = juan_and_maria().await;

    let result = filter(&records, StatusFilter::All, "maria");

    assert_eq!(ids(&result), vec!["2"]);
}

#[tokio::test]
async fn status_filter_alone_selects_matching_records() {
    let records = juan_and_maria().await;

    assert_eq!(ids(&filter(&records, StatusFilter::Confirmed, "")), vec!["1"]);
    assert_eq!(ids(&filter(&records, StatusFilter::Pending, "")), vec!["2"]);
    assert!(filter(&records, StatusFilter::Cancelled, "").is_empty());
}

#[tokio::test]
async fn empty_query_returns_everything_in_order() {
    let records = juan_and_maria().await;

    assert_eq!(ids(&filter(&records, StatusFilter::All, "")), vec!["1", "2"]);
    assert_eq!(ids(&filter(&records, StatusFilter::All, "  \t ")), vec!["1", "2"]);
}

#[tokio::test]
async fn search_matches_email_and_trims_input() {
    let records = juan_and_maria().await;

    assert_eq!(ids(&filter(&records, StatusFilter::All, "  JUAN@X ")), vec!["1"]);
    assert_eq!(ids(&filter(&records, StatusFilter::All, "@x.com")), vec!["1", "2"]);
    assert!(filter(&records, StatusFilter::All, "ceramics").is_empty());
}

#[tokio::test]
async fn both_predicates_must_pass() {
    let records = juan_and_maria().await;

    assert!(filter(&records, StatusFilter::Pending, "juan").is_empty());
    assert_eq!(ids(&filter(&records, StatusFilter::Pending, "garcia")), vec!["2"]);
}

#[test]
fn empty_collection_yields_empty_result() {
    let records: Records = Arc::from(Vec::new());
    assert!(filter(&records, StatusFilter::All, "anyone").is_empty());
}

#[tokio::test]
async fn output_is_always_an_ordered_subsequence() {
    let store = loaded_store().await;
    for (name, status) in [
        ("Ana Ruiz", EnrollmentStatus::Pending),
        ("Mariana Lopez", EnrollmentStatus::Cancelled),
        ("Pedro Maria", EnrollmentStatus::Confirmed),
    ] {
        store.create(input(None, name, "shared@x.com", status));
    }
    let records = store.records();

    let filters = [
        StatusFilter::All,
        StatusFilter::Pending,
        StatusFilter::Confirmed,
        StatusFilter::Cancelled,
    ];
    for status in filters {
        for search in ["", "maria", "x.com", "shared", "nobody", " A "] {
            let output = filter(&records, status, search);
            assert!(
                is_ordered_subsequence(&output, &records),
                "{status:?}/{search:?} reordered or invented records"
            );
        }
    }
}

#[tokio::test]
async fn filter_does_not_touch_its_input() {
    let records = juan_and_maria().await;
    let copy: Vec<_> = records.iter().map(|record| (**record).clone()).collect();

    let _ = filter(&records, StatusFilter::Pending, "maria");

    let after: Vec<_> = records.iter().map(|record| (**record).clone()).collect();
    assert_eq!(copy, after);
}

#[tokio::test]
async fn memoized_view_returns_same_output_for_same_inputs() {
    let records = juan_and_maria().await;
    let mut view = FilteredView::new();

    let first = view.apply(&records, StatusFilter::All, "maria");
    let second = view.apply(&records, StatusFilter::All, "maria");
    let normalized_alike = view.apply(&records, StatusFilter::All, "  MARIA ");

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &normalized_alike));
}

#[tokio::test]
async fn memoized_view_recomputes_when_any_input_changes() {
    let store = loaded_store().await;
    let mut view = FilteredView::new();
    let query = EnrollmentQuery::default();

    let initial = view.apply_query(&store.records(), &query);

    let by_status = view.apply(&store.records(), StatusFilter::Pending, "");
    assert!(!Arc::ptr_eq(&initial, &by_status));
    assert_eq!(ids(&by_status), vec!["2"]);

    store.confirm_by_id(&crate::enrollments::EnrollmentId::from("2"));
    let after_confirm = view.apply(&store.records(), StatusFilter::Pending, "");
    assert!(after_confirm.is_empty());
}

#[tokio::test]
async fn counts_tally_every_status() {
    let store = loaded_store().await;
    store.create(input(None, "Gone", "gone@x.com", EnrollmentStatus::Cancelled));

    let counts = StatusCounts::tally(&store.records());

    assert_eq!(
        counts,
        StatusCounts {
            all: 3,
            pending: 1,
            confirmed: 1,
            cancelled: 1,
        }
    );
    assert_eq!(counts.for_filter(StatusFilter::All), 3);
    assert_eq!(counts.for_filter(StatusFilter::Cancelled), 1);
}

#[test]
fn query_deserializes_with_defaults() {
    let query: EnrollmentQuery = serde_json::from_str("{}").expect("empty query parses");
    assert_eq!(query.status, StatusFilter::All);
    assert!(query.search.is_empty());

    let query: EnrollmentQuery =
        serde_json::from_str(r#"{"status":"confirmed","search":"juan"}"#).expect("parses");
    assert_eq!(query.status, StatusFilter::Confirmed);
}
