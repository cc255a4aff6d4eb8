//! Record source: turns a workbook or a JSON dump into ordered `RowRecord`s.
//!
//! The first row (or the first JSON object) defines the column names. Empty cells are
//! left out of a record, so "absent" and "blank" look the same to the engines.

use crate::config::ProcessOptions;
use crate::ndjson::{is_zst, NdjsonReader};
use crate::progress::ProgressScope;
use crate::record::{CellValue, RowRecord};
use crate::util::open_with_backoff;
use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use indexmap::IndexSet;
use serde_json::Value;
use std::io::BufReader;
use std::path::Path;
use time::macros::{datetime, format_description};
use time::{Date, Duration, PrimitiveDateTime};

/// Headers in source order plus the data rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub records: Vec<RowRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Workbook,
    Ndjson,
    JsonArray,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        if is_zst(path) {
            return Ok(SourceFormat::Ndjson);
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceFormat::Workbook),
            "ndjson" | "jsonl" => Ok(SourceFormat::Ndjson),
            "json" => Ok(SourceFormat::JsonArray),
            _ => bail!("unsupported input format: {}", path.display()),
        }
    }
}

pub fn read_records(path: &Path, opts: &ProcessOptions) -> Result<SourceTable> {
    let table = match SourceFormat::from_path(path)? {
        SourceFormat::Workbook => read_workbook(path, opts)?,
        SourceFormat::Ndjson => read_ndjson(path, opts)?,
        SourceFormat::JsonArray => read_json_array(path, opts)?,
    };
    tracing::info!(path = %path.display(), columns = table.headers.len(), rows = table.records.len(), "Records loaded");
    Ok(table)
}

/// First worksheet only. A workbook without sheets is a hard error.
pub fn read_workbook(path: &Path, opts: &ProcessOptions) -> Result<SourceTable> {
    let mut wb: Sheets<_> = open_workbook_auto(path).with_context(|| format!("open workbook {}", path.display()))?;
    let first = wb
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("No worksheet found in the workbook {}", path.display()))?;
    let range = wb
        .worksheet_range(&first)
        .with_context(|| format!("read sheet '{}' of {}", first, path.display()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        tracing::warn!(sheet = %first, "First worksheet is empty");
        return Ok(SourceTable::default());
    };
    let headers = unique_headers(header_row.iter().enumerate().map(|(i, c)| match cell_from_data(c) {
        c if c.is_blank() => format!("Column{}", i + 1),
        c => c.to_key_string(),
    }));

    let (height, _) = range.get_size();
    let pb = ProgressScope::count(
        opts.progress_label.clone().unwrap_or_else(|| "Reading rows".to_string()),
        height.saturating_sub(1) as u64,
        opts.progress,
    );

    let mut records = Vec::with_capacity(height.saturating_sub(1));
    for row in rows {
        let rec: RowRecord = headers
            .iter()
            .zip(row)
            .map(|(h, d)| (h.as_str(), cell_from_data(d)))
            .filter(|(_, c)| !c.is_empty())
            .collect();
        records.push(rec);
        pb.inc(1);
    }
    pb.finish(format!("{} rows read", records.len()));

    Ok(SourceTable { headers, records })
}

/// Repeated names get a `_2`, `_3`, ... suffix so every column keeps its own cells.
fn unique_headers(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: IndexSet<String> = IndexSet::new();
    for name in names {
        if !seen.contains(&name) {
            seen.insert(name);
            continue;
        }
        let renamed = (2..)
            .map(|n| format!("{name}_{n}"))
            .find(|candidate| !seen.contains(candidate))
            .unwrap_or_default();
        tracing::warn!(column = %name, renamed = %renamed, "Duplicate column header renamed");
        seen.insert(renamed);
    }
    seen.into_iter().collect()
}

/// One JSON object per line. Unparseable or non-object lines are skipped with a warning.
pub fn read_ndjson(path: &Path, opts: &ProcessOptions) -> Result<SourceTable> {
    let mut rdr = NdjsonReader::open(path, opts.read_buffer_bytes).with_context(|| format!("open {}", path.display()))?;
    let pb = ProgressScope::count(opts.progress_label.clone().unwrap_or_else(|| "Reading rows".to_string()), 0, opts.progress);

    let mut headers: IndexSet<String> = IndexSet::new();
    let mut records = Vec::new();
    let mut buf = String::with_capacity(4 * 1024);
    let mut line_no = 0u64;
    loop {
        let n = rdr.read_line(&mut buf).with_context(|| format!("read {}", path.display()))?;
        if n == 0 { break; }
        line_no += 1;
        if buf.trim().is_empty() { continue; }

        let rec = match serde_json::from_str::<Value>(&buf) {
            Ok(v) => RowRecord::from_json(&v),
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping unparseable line");
                continue;
            }
        };
        let Some(rec) = rec else {
            tracing::warn!(line = line_no, "Skipping non-object line");
            continue;
        };
        for col in rec.columns() {
            if !headers.contains(col) {
                headers.insert(col.to_string());
            }
        }
        records.push(rec);
        pb.inc(1);
    }
    pb.set_total(records.len() as u64);
    pb.finish(format!("{} rows read", records.len()));

    Ok(SourceTable { headers: headers.into_iter().collect(), records })
}

/// A JSON array of objects. Any other top-level shape yields an empty table.
pub fn read_json_array(path: &Path, opts: &ProcessOptions) -> Result<SourceTable> {
    let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let v: Value = serde_json::from_reader(BufReader::with_capacity(opts.read_buffer_bytes, f))
        .with_context(|| format!("parse {}", path.display()))?;
    let Some(items) = v.as_array() else {
        tracing::warn!(path = %path.display(), "Expected a JSON array of records; nothing to read");
        return Ok(SourceTable::default());
    };

    let mut headers: IndexSet<String> = IndexSet::new();
    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(rec) = RowRecord::from_json(item) else {
            tracing::warn!(index = i, "Skipping non-object array element");
            continue;
        };
        for col in rec.columns() {
            if !headers.contains(col) {
                headers.insert(col.to_string());
            }
        }
        records.push(rec);
    }
    Ok(SourceTable { headers: headers.into_iter().collect(), records })
}

#[allow(unreachable_patterns)]
fn cell_from_data(d: &Data) -> CellValue {
    match d {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_datetime(serial).map(CellValue::Date).unwrap_or(CellValue::Number(serial))
        }
        Data::DateTimeIso(s) => parse_iso(s).map(CellValue::Date).unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

/// 1900 date system. Serial 1 is 1900-01-01 and serial 61 is 1900-03-01; Excel's
/// phantom 1900-02-29 (serial 60) reads as 1900-03-01.
pub(crate) fn excel_serial_to_datetime(serial: f64) -> Option<PrimitiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = if serial < 61.0 { datetime!(1899-12-31 0:00) } else { datetime!(1899-12-30 0:00) };
    let secs = (serial * 86_400.0).round() as i64;
    epoch.checked_add(Duration::seconds(secs))
}

fn parse_iso(s: &str) -> Option<PrimitiveDateTime> {
    let full = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let date_only = format_description!("[year]-[month]-[day]");
    PrimitiveDateTime::parse(s, full)
        .ok()
        .or_else(|| Date::parse(s, date_only).ok().map(|d| d.midnight()))
}
