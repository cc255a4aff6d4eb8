//! Headline counters over the deduplicated records.

use crate::config::ProcessOptions;
use crate::dedupe::DedupStats;
use crate::record::{CellValue, RowRecord, Status};
use serde::Serialize;
use time::{Date, PrimitiveDateTime};

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_records_processed: u64,
    pub unique_records: u64,
    pub pending_cases: u64,
    pub disposed_cases: u64,
    pub civil_cases: u64,
    pub criminal_cases: u64,
    /// Mean age (years) of pending cases with a usable age value.
    pub avg_age_pending: Option<f64>,
    pub duplicates_found: u64,
    pub duplicates_removed: u64,
}

/// Independent reductions over `unique`; `total_input` is the row count before dedup.
pub fn summarize(unique: &[RowRecord], total_input: u64, stats: &DedupStats, opts: &ProcessOptions) -> Summary {
    let mut s = Summary {
        total_records_processed: total_input,
        unique_records: unique.len() as u64,
        duplicates_found: stats.duplicates_found,
        duplicates_removed: stats.duplicates_removed,
        ..Default::default()
    };

    let as_of = opts.as_of.unwrap_or_else(|| time::OffsetDateTime::now_utc().date());
    let mut age_sum = 0.0f64;
    let mut age_n = 0u64;

    for rec in unique {
        match rec.status(&opts.status_field) {
            Status::Pending => {
                s.pending_cases += 1;
                if let Some(age) = rec.value(&opts.age_field).and_then(|c| age_in_years(c, as_of)) {
                    age_sum += age;
                    age_n += 1;
                }
            }
            Status::Dispose => s.disposed_cases += 1,
            Status::Other(_) => {}
        }

        if let Some(cat) = rec.value(&opts.category_field).map(CellValue::to_key_string) {
            if opts.civil_pattern.is_match(&cat) {
                s.civil_cases += 1;
            } else if opts.criminal_pattern.is_match(&cat) {
                s.criminal_cases += 1;
            }
        }
    }

    if age_n > 0 {
        s.avg_age_pending = Some(round2(age_sum / age_n as f64));
    }
    s
}

/// Numbers and numeric text are already in years; dates are filing dates.
fn age_in_years(cell: &CellValue, as_of: Date) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(t) => t.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        CellValue::Date(dt) => years_between(*dt, as_of),
        _ => None,
    }
}

fn years_between(filed: PrimitiveDateTime, as_of: Date) -> Option<f64> {
    let days = (as_of - filed.date()).whole_days();
    (days >= 0).then(|| days as f64 / DAYS_PER_YEAR)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
