//! End-to-end report scenarios through the public API.

use reports::{
    build_pivot, build_totals, coerce_count, normalize_category, records_from_rows, CategorySet,
    PivotCell, RawRecord, Report, ReportKind, ReportPeriod,
};
use serde_json::json;

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn normalization_is_total() {
    let sets = [CategorySet::membership(), CategorySet::congress_categories()];
    let inputs = [
        None,
        Some(""),
        Some("   "),
        Some("Member"),
        Some("MEMBER"),
        Some("associate coordinator"),
        Some("Associate Coord"),
        Some("student"),
        Some("\u{0}garbage\u{fffd}"),
        Some("Coordinator of associates"),
    ];

    for set in &sets {
        for input in inputs {
            let label = normalize_category(input, set);
            assert!(
                label.is_some_and(|l| set.contains(l)),
                "{:?} normalized to {:?}",
                input,
                label
            );
        }
    }
}

#[test]
fn pivot_columns_sum_to_totals() {
    let rows = vec![
        json!({"region": "North", "category": "Student", "gender": "male", "total": 4}),
        json!({"region": "North", "category": "youth", "gender": "female", "total": "3"}),
        json!({"region": "South", "category": "Corper", "gender": "Female", "total": 2.5}),
        json!({"region": null, "category": "Pastor", "gender": "male", "total": 1}),
        json!({"region": "East", "category": "Staff", "gender": "unknown", "total": 6}),
        json!({"category": "Children", "gender": "male", "total": "abc"}),
    ];
    let kind = ReportKind::CategoriesByRegion;
    let records = records_from_rows(&rows, &kind.layout());
    let set = kind.categories();

    let pivot = build_pivot(&records, &keys(&["West"]), &set);
    let totals = build_totals(&records, &set);

    for label in set.labels() {
        assert_eq!(pivot.column_sum(label), totals.get(label), "category {}", label);
    }
    assert_eq!(totals.get("Others"), PivotCell::new(1, 0));
    assert_eq!(totals.get("Corper"), PivotCell::new(0, 2));
}

#[test]
fn non_numeric_counts_contribute_zero() {
    assert_eq!(coerce_count(Some(&json!("abc"))), 0);
    assert_eq!(coerce_count(Some(&json!(null))), 0);
    assert_eq!(coerce_count(Some(&json!("5"))), 5);

    let layout = ReportKind::MembershipByRegion.layout();
    let records = records_from_rows(
        &[
            json!({"region": "North", "membership_status": "Member", "gender": "male", "total": "abc"}),
            json!({"region": "North", "membership_status": "Member", "gender": "male", "total": null}),
            json!({"region": "North", "membership_status": "Member", "gender": "male", "total": "5"}),
        ],
        &layout,
    );
    let report = Report::for_kind(ReportKind::MembershipByRegion, &records, &[]);

    assert_eq!(report.pivot.cell("North", "Member"), PivotCell::new(5, 0));
}

#[test]
fn unrecognized_gender_counts_in_neither_bucket() {
    let records = vec![
        RawRecord::new("A", "Worker", "Other", 7),
        RawRecord {
            grouping_key: Some("A".into()),
            category: Some("Worker".into()),
            gender: None,
            count: 2,
        },
    ];
    let report = Report::for_kind(ReportKind::MembershipByInstitution, &records, &[]);

    assert!(report.pivot.contains_key("A"));
    assert_eq!(report.pivot.cell("A", "Worker"), PivotCell::new(0, 0));
    assert_eq!(report.totals.grand_total(), 0);
}

#[test]
fn known_keys_are_seeded_empty() {
    let set = CategorySet::membership();
    let pivot = build_pivot(&[], &keys(&["A", "B"]), &set);

    assert_eq!(pivot.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    assert!(pivot.get("A").unwrap().cells.is_empty());
    assert!(pivot.get("B").unwrap().cells.is_empty());
}

#[test]
fn unknown_keys_are_surfaced() {
    let records = vec![RawRecord::new("Q", "Guest", "female", 1)];
    let pivot = build_pivot(&records, &keys(&["A", "B"]), &CategorySet::membership());

    assert_eq!(pivot.keys().collect::<Vec<_>>(), vec!["A", "B", "Q"]);
    assert_eq!(pivot.cell("Q", "Guest"), PivotCell::new(0, 1));
}

#[test]
fn institution_report_end_to_end() {
    let records = vec![
        RawRecord::new("A", "Member", "male", 3),
        RawRecord::new("A", "Member", "female", 2),
        RawRecord::new("B", "Guest", "male", 1),
    ];
    let report = Report::for_kind(
        ReportKind::MembershipByInstitution,
        &records,
        &keys(&["A", "B", "C"]),
    );

    assert_eq!(report.pivot.cell("A", "Member"), PivotCell::new(3, 2));
    assert_eq!(report.pivot.cell("B", "Guest"), PivotCell::new(1, 0));
    assert!(report.pivot.get("C").unwrap().cells.is_empty());
    assert_eq!(report.totals.get("Member"), PivotCell::new(3, 2));
    assert_eq!(report.totals.get("Guest"), PivotCell::new(1, 0));

    let body = report.grid.body();
    assert_eq!(
        body[0],
        vec!["A", "0", "0", "0", "2", "3", "5", "0", "0", "0", "0", "0", "0", "5"]
    );
    assert_eq!(
        body[1],
        vec!["B", "0", "1", "1", "0", "0", "0", "0", "0", "0", "0", "0", "0", "1"]
    );
    assert_eq!(
        body[2],
        vec!["C", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0", "0"]
    );
    assert_eq!(
        report.grid.total_row(),
        &["Total", "0", "1", "1", "2", "3", "5", "0", "0", "0", "0", "0", "0", "6"]
    );
}

#[test]
fn rebuilding_is_idempotent() {
    let records = vec![
        RawRecord::new("A", "member", "MALE", 3),
        RawRecord::new("", "associate coord", "female", 2),
    ];
    let known = keys(&["A", "Z"]);

    let first = Report::for_kind(ReportKind::MembershipByCluster, &records, &known);
    let second = Report::for_kind(ReportKind::MembershipByCluster, &records, &known);

    assert_eq!(first, second);
}

#[test]
fn huge_counts_saturate_end_to_end() {
    let rows = vec![
        json!({"region": "North", "category": "Student", "gender": "male", "total": "1e19"}),
        json!({"region": "North", "category": "Student", "gender": "male", "total": "1e19"}),
    ];
    let kind = ReportKind::CategoriesByRegion;
    let records = records_from_rows(&rows, &kind.layout());
    let report = Report::for_kind(kind, &records, &[]);

    assert_eq!(report.pivot.cell("North", "Student").male, u64::MAX);
    assert_eq!(report.totals.grand_total(), u64::MAX);
    assert_eq!(report.grid.total_row().last().unwrap(), &u64::MAX.to_string());
}

#[test]
fn daily_state_report_end_to_end() {
    let rows = vec![
        json!({"state": "Oyo", "day_key": "day1", "gender": "male", "total": 2}),
        json!({"state": "Oyo", "registration_date": "2025-04-02T08:30:00", "gender": "female", "total": 3}),
        json!({"state": "Lagos", "registration_date": "2025-05-01", "gender": "male", "total": 9}),
    ];
    let kind = ReportKind::StatesByDay;
    let records = records_from_rows(&rows, &kind.layout());
    let period = ReportPeriod::new(Some("2025-04-01".into()), Some("2025-04-02".into()));
    let report = Report::for_period(kind, &records, &keys(&["Oyo"]), &period);

    assert_eq!(report.grid.header()[1], "Day 1 (Apr 1)");
    assert_eq!(report.grid.header()[4], "Day 2 (Apr 2)");
    assert_eq!(report.grid.header()[7], "Grand Total");
    assert!(!report.pivot.contains_key("Lagos"));
    assert_eq!(
        report.grid.body()[0],
        vec!["Oyo", "0", "2", "2", "3", "0", "3", "3", "2", "5"]
    );
    assert_eq!(report.grid.total_row()[0], "Grand Total");
}
