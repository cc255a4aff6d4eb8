#![allow(dead_code)]

use caseproc::RowRecord;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Minimal case row: just the key and a status.
pub fn case(uid: &str, status: &str) -> RowRecord {
    RowRecord::new().with("UID", uid).with("STATUS", status)
}

/// A case row carrying every column the default pivots group by.
pub fn full_case(uid: &str, status: &str, cat: &str, age_cat: &str, stage: &str, side: &str, age: f64) -> RowRecord {
    RowRecord::new()
        .with("UID", uid)
        .with("STATUS", status)
        .with("CAT1", cat)
        .with("AGE CAT1", age_cat)
        .with("STAGE", stage)
        .with("SIDE", side)
        .with("AGE", age)
}

/// Ten rows, six distinct UIDs:
/// - C1 PENDING then DISPOSE (dispose promoted into C1's slot)
/// - C2 PENDING twice (second dropped)
/// - C3 DISPOSE then PENDING (pending dropped)
/// - C4, C5 single PENDING / DISPOSE
/// - one row without UID (dropped, not counted)
/// - C6 single PENDING with no SIDE (pivots bucket it as Unknown)
///
/// Survivors: C1 DISPOSE, C2 PENDING(age 2), C3 DISPOSE, C4 PENDING(age 4), C5 DISPOSE, C6 PENDING(age 6)
pub fn sample_cases() -> Vec<RowRecord> {
    vec![
        full_case("C1", "PENDING", "CIVIL", "0-1", "TRIAL", "PLAINTIFF", 1.0),
        full_case("C2", "PENDING", "CRIMINAL", "1-3", "HEARING", "DEFENDANT", 2.0),
        full_case("C1", "DISPOSE", "CIVIL", "0-1", "JUDGMENT", "PLAINTIFF", 1.0),
        full_case("C3", "DISPOSE", "CIVIL", "3-5", "JUDGMENT", "DEFENDANT", 3.0),
        full_case("C2", "PENDING", "CRIMINAL", "1-3", "TRIAL", "DEFENDANT", 9.0),
        full_case("C3", "PENDING", "CIVIL", "3-5", "TRIAL", "DEFENDANT", 3.0),
        RowRecord::new().with("STATUS", "PENDING").with("CAT1", "CIVIL"),
        full_case("C4", "PENDING", "CRIMINAL", "3-5", "TRIAL", "PLAINTIFF", 4.0),
        full_case("C5", "DISPOSE", "CRIMINAL", "0-1", "JUDGMENT", "DEFENDANT", 1.0),
        RowRecord::new()
            .with("UID", "C6")
            .with("STATUS", "PENDING")
            .with("CAT1", "CIVIL")
            .with("AGE CAT1", "5+")
            .with("STAGE", "HEARING")
            .with("AGE", 6.0),
    ]
}

pub fn sample_cases_json() -> Vec<Value> {
    sample_cases().iter().map(RowRecord::to_json).collect()
}

pub fn scratch_dir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

pub fn write_ndjson(path: &Path, rows: &[Value]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for r in rows {
        writeln!(&mut f, "{}", r).unwrap();
    }
}

/// Same as `write_ndjson`, zstd-compressed.
pub fn write_zst_lines(path: &Path, rows: &[Value]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for r in rows {
        writeln!(&mut enc, "{}", r).unwrap();
    }
    enc.finish().unwrap();
}

pub fn write_json(path: &Path, v: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec(v).unwrap()).unwrap();
}

/// Input workbook with a single sheet: header row then `rows` (strings, numbers, or blanks as "").
pub fn write_input_xlsx(path: &Path, headers: &[&str], rows: &[Vec<Value>]) {
    let mut wb = rust_xlsxwriter::Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Cases").unwrap();
    for (c, h) in headers.iter().enumerate() {
        ws.write_string(0, c as u16, *h).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, v) in row.iter().enumerate() {
            let (r, c) = ((r + 1) as u32, c as u16);
            match v {
                Value::Number(n) => { ws.write_number(r, c, n.as_f64().unwrap()).unwrap(); }
                Value::String(s) if s.is_empty() => {}
                Value::String(s) => { ws.write_string(r, c, s.as_str()).unwrap(); }
                _ => {}
            }
        }
    }
    wb.save(path).unwrap();
}

/// The headers/rows of `sample_cases()` laid out for `write_input_xlsx`.
pub fn sample_sheet() -> (Vec<&'static str>, Vec<Vec<Value>>) {
    let headers = vec!["UID", "STATUS", "CAT1", "AGE CAT1", "STAGE", "SIDE", "AGE"];
    let rows = sample_cases_json()
        .into_iter()
        .map(|v| headers.iter().map(|h| v.get(*h).cloned().unwrap_or(json!(""))).collect())
        .collect();
    (headers, rows)
}

/// Read one sheet of an output workbook as rows of display strings.
pub fn read_sheet_strings(path: &Path, sheet: &str) -> Vec<Vec<String>> {
    use calamine::{open_workbook_auto, Data, Reader};
    let mut wb = open_workbook_auto(path).unwrap();
    let range = wb.worksheet_range(sheet).unwrap();
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|d| match d {
                    Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

pub fn sheet_names(path: &Path) -> Vec<String> {
    use calamine::{open_workbook_auto, Reader};
    let wb = open_workbook_auto(path).unwrap();
    wb.sheet_names().to_vec()
}
