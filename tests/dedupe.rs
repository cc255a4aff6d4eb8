#[path = "common/mod.rs"]
mod common;

use caseproc::{resolve, DedupStats, DedupeCfg, DuplicateResolver, KeyExtractor, Resolution, RowRecord, Status};
use common::*;
use serde_json::json;

fn uids(records: &[RowRecord]) -> Vec<String> {
    records.iter().map(|r| r.get("UID").unwrap().to_key_string()).collect()
}

fn statuses(records: &[RowRecord]) -> Vec<String> {
    records.iter().map(|r| r.get("STATUS").unwrap().to_key_string()).collect()
}

/// PENDING then DISPOSE for UID 1: the DISPOSE row replaces the PENDING one
/// in place, and UID 2 is untouched.
#[test]
fn dispose_replaces_pending_in_place() {
    let input = vec![
        RowRecord::new().with("UID", 1).with("STATUS", "PENDING"),
        RowRecord::new().with("UID", 1).with("STATUS", "DISPOSE"),
        RowRecord::new().with("UID", 2).with("STATUS", "PENDING"),
    ];
    let out = resolve(input, "UID");

    assert_eq!(uids(&out.records), vec!["1", "2"]);
    assert_eq!(statuses(&out.records), vec!["DISPOSE", "PENDING"]);
    assert_eq!(
        out.stats,
        DedupStats { duplicates_found: 1, duplicates_removed: 0, pending_removed: 1, dispose_kept: 1 }
    );
}

/// Two identical PENDING rows: one kept, counted as a plain duplicate removal.
#[test]
fn same_status_keeps_first() {
    let out = resolve(vec![case("5", "PENDING"), case("5", "PENDING")], "UID");
    assert_eq!(out.records.len(), 1);
    assert_eq!(
        out.stats,
        DedupStats { duplicates_found: 1, duplicates_removed: 1, pending_removed: 0, dispose_kept: 0 }
    );

    // Earliest DISPOSE wins too; tell the rows apart by an extra column.
    let first = case("7", "DISPOSE").with("NOTE", "first");
    let second = case("7", "DISPOSE").with("NOTE", "second");
    let out = resolve(vec![first.clone(), second], "UID");
    assert_eq!(out.records, vec![first]);
    assert_eq!(out.stats.duplicates_removed, 1);
}

/// DISPOSE then PENDING: DISPOSE stays, the PENDING row is counted as pending removed.
#[test]
fn dispose_wins_regardless_of_arrival_order() {
    let out = resolve(vec![case("9", "DISPOSE"), case("9", "PENDING")], "UID");
    assert_eq!(statuses(&out.records), vec!["DISPOSE"]);
    assert_eq!(
        out.stats,
        DedupStats { duplicates_found: 1, duplicates_removed: 0, pending_removed: 1, dispose_kept: 0 }
    );
}

/// Statuses outside PENDING/DISPOSE keep the existing row and only bump `duplicates_found`.
#[test]
fn unrecognized_status_keeps_existing_without_counters() {
    let out = resolve(
        vec![case("3", "TRANSFERRED"), case("3", "DISPOSE"), case("4", "PENDING"), RowRecord::new().with("UID", "4")],
        "UID",
    );
    assert_eq!(statuses(&out.records), vec!["TRANSFERRED", "PENDING"]);
    assert_eq!(
        out.stats,
        DedupStats { duplicates_found: 2, duplicates_removed: 0, pending_removed: 0, dispose_kept: 0 }
    );
}

/// Rows without a usable key are dropped and leave every counter alone.
#[test]
fn keyless_rows_are_dropped_silently() {
    let input = vec![
        RowRecord::new().with("STATUS", "PENDING"),
        case("", "PENDING"),
        case("   ", "DISPOSE"),
        case("A", "PENDING"),
    ];
    let out = resolve(input, "UID");
    assert_eq!(uids(&out.records), vec!["A"]);
    assert_eq!(out.stats, DedupStats::default());
}

/// Output order is first-appearance order of each key, even across replacements.
#[test]
fn order_follows_first_appearance() {
    let out = resolve(sample_cases(), "UID");
    assert_eq!(uids(&out.records), vec!["C1", "C2", "C3", "C4", "C5", "C6"]);
    assert_eq!(statuses(&out.records), vec!["DISPOSE", "PENDING", "DISPOSE", "PENDING", "DISPOSE", "PENDING"]);
    // C1 was replaced by its DISPOSE row (stage JUDGMENT), C2 kept its first row (age 2).
    assert_eq!(out.records[0].get("STAGE").unwrap().to_key_string(), "JUDGMENT");
    assert_eq!(out.records[1].get("AGE").unwrap().as_f64(), Some(2.0));
    assert_eq!(
        out.stats,
        DedupStats { duplicates_found: 3, duplicates_removed: 1, pending_removed: 2, dispose_kept: 1 }
    );
}

/// A PENDING/DISPOSE pair resolves to DISPOSE whichever comes first, and a longer
/// run of alternating rows still leaves exactly one record per key.
#[test]
fn one_record_per_key_and_dispose_precedence() {
    let input = vec![
        case("K", "PENDING"),
        case("J", "DISPOSE"),
        case("K", "PENDING"),
        case("J", "PENDING"),
        case("K", "DISPOSE"),
        case("K", "PENDING"),
        case("J", "DISPOSE"),
    ];
    let out = resolve(input, "UID");
    assert_eq!(uids(&out.records), vec!["K", "J"]);
    assert_eq!(statuses(&out.records), vec!["DISPOSE", "DISPOSE"]);
    assert_eq!(out.stats.duplicates_found, 5);
}

/// Status text is trimmed before matching; the stored cell keeps its raw text.
#[test]
fn padded_status_still_matches() {
    let out = resolve(vec![case("P", "PENDING"), case("P", " DISPOSE ")], "UID");
    assert_eq!(out.stats.dispose_kept, 1);
    assert_eq!(out.records[0].get("STATUS").unwrap().to_key_string(), " DISPOSE ");
}

/// Numeric and textual keys share a string form, so 1 and "1" collide.
#[test]
fn numeric_keys_use_string_form() {
    let out = resolve(
        vec![RowRecord::new().with("UID", 1.0).with("STATUS", "PENDING"), case("1", "DISPOSE")],
        "UID",
    );
    assert_eq!(out.records.len(), 1);
    assert_eq!(statuses(&out.records), vec!["DISPOSE"]);
}

/// Reusing one resolver must not leak counters from the previous run.
#[test]
fn resolver_resets_between_runs() {
    let mut r = DuplicateResolver::with_key("UID");
    let first = r.resolve(sample_cases());
    assert_eq!(first.stats.duplicates_found, 3);

    let second = r.resolve(vec![case("X", "PENDING"), case("X", "PENDING")]);
    assert_eq!(
        second.stats,
        DedupStats { duplicates_found: 1, duplicates_removed: 1, pending_removed: 0, dispose_kept: 0 }
    );
    assert_eq!(r.stats(), second.stats);

    r.reset();
    assert_eq!(r.stats(), DedupStats::default());
}

/// Non-array payloads degrade to an empty outcome; non-object elements count as keyless.
#[test]
fn resolve_json_handles_invalid_input() {
    let mut r = DuplicateResolver::with_key("UID");
    r.resolve(vec![case("A", "PENDING"), case("A", "PENDING")]);

    let out = r.resolve_json(&json!({ "UID": "A", "STATUS": "PENDING" }));
    assert!(out.records.is_empty());
    assert_eq!(out.stats, DedupStats::default());
    assert_eq!(r.stats(), DedupStats::default());

    let out = r.resolve_json(&json!([
        { "UID": "A", "STATUS": "PENDING" },
        42,
        "junk",
        { "UID": "A", "STATUS": "DISPOSE" },
    ]));
    assert_eq!(statuses(&out.records), vec!["DISPOSE"]);
    assert_eq!(out.stats.dispose_kept, 1);
}

/// Custom key extractors and status columns plug into the same policy.
#[test]
fn custom_key_and_status_field() {
    let cfg = DedupeCfg {
        key: KeyExtractor::by_record(|r| r.value("CASE NO").map(|c| c.to_key_string().trim().to_uppercase())),
        status_field: "STATE".to_string(),
    };
    let input = vec![
        RowRecord::new().with("CASE NO", "cv-01 ").with("STATE", "PENDING"),
        RowRecord::new().with("CASE NO", "CV-01").with("STATE", "DISPOSE"),
    ];
    let out = DuplicateResolver::new(cfg).resolve(input);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].get("STATE").unwrap().to_key_string(), "DISPOSE");
}

#[test]
fn precedence_table() {
    use Resolution::*;
    let other = Status::Other("CLOSED".into());
    assert_eq!(Resolution::between(&Status::Pending, &Status::Dispose), PromoteDispose);
    assert_eq!(Resolution::between(&Status::Pending, &Status::Pending), DropSameStatus);
    assert_eq!(Resolution::between(&Status::Dispose, &Status::Dispose), DropSameStatus);
    assert_eq!(Resolution::between(&Status::Dispose, &Status::Pending), DropPending);
    assert_eq!(Resolution::between(&other, &Status::Dispose), KeepUnrecognized);
    assert_eq!(Resolution::between(&Status::Pending, &other), KeepUnrecognized);
    assert!(PromoteDispose.replaces_existing());
    assert!(!DropPending.replaces_existing());
}
