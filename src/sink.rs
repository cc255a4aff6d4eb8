//! Output sink: the processed workbook (deduplicated rows + one sheet per pivot)
//! and a JSON rendition of the same results.

use crate::aggregate::PivotTable;
use crate::ndjson::{inprogress_path, NdjsonWriter};
use crate::record::{CellValue, RowRecord};
use crate::summary::Summary;
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Width used for an empty cell when sizing columns.
const EMPTY_CELL_WIDTH: usize = 10;
const MAX_COLUMN_WIDTH: usize = 50;

/// Write `Processed Data` (or `data_sheet_name`) followed by one sheet per pivot.
/// Rows are written in `headers` order; columns a record lacks stay blank.
pub fn write_workbook(
    path: &Path,
    data_sheet_name: &str,
    headers: &[String],
    records: &[RowRecord],
    pivots: &[PivotTable],
) -> Result<()> {
    let mut wb = Workbook::new();
    let date_fmt = Format::new().set_num_format("yyyy-mm-dd");

    let ws = wb.add_worksheet();
    ws.set_name(data_sheet_name).with_context(|| format!("sheet name {data_sheet_name:?}"))?;
    write_sheet(ws, headers, records, &date_fmt)?;

    for pivot in pivots {
        let ws = wb.add_worksheet();
        ws.set_name(&pivot.name).with_context(|| format!("sheet name {:?}", pivot.name))?;
        write_sheet(ws, &pivot.headers(), &pivot.to_records(), &date_fmt)?;
    }

    let tmp = inprogress_path(path);
    wb.save(&tmp).with_context(|| format!("save workbook {}", tmp.display()))?;
    replace_file_atomic_backoff(&tmp, path)?;
    tracing::info!(path = %path.display(), sheets = pivots.len() + 1, "Workbook written");
    Ok(())
}

fn write_sheet(ws: &mut Worksheet, headers: &[String], records: &[RowRecord], date_fmt: &Format) -> Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();

    for (c, h) in headers.iter().enumerate() {
        ws.write_string(0, c as u16, h)?;
    }
    for (r, rec) in records.iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, h) in headers.iter().enumerate() {
            let col = c as u16;
            let cell = rec.get(h).unwrap_or(&CellValue::Empty);
            let w = if cell.is_blank() { EMPTY_CELL_WIDTH } else { cell.to_key_string().chars().count() };
            widths[c] = widths[c].max(w);
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => { ws.write_string(row, col, s)?; }
                CellValue::Number(n) => { ws.write_number(row, col, *n)?; }
                CellValue::Bool(b) => { ws.write_boolean(row, col, *b)?; }
                CellValue::Date(dt) => {
                    let xl = ExcelDateTime::from_ymd(dt.year() as u16, dt.month() as u8, dt.day())?
                        .and_hms(dt.hour() as u16, dt.minute(), f64::from(dt.second()))?;
                    ws.write_datetime_with_format(row, col, &xl, date_fmt)?;
                }
            }
        }
    }

    for (c, w) in widths.into_iter().enumerate() {
        ws.set_column_width(c as u16, column_width(w) as f64)?;
    }
    Ok(())
}

/// Longest cell plus padding, capped.
pub fn column_width(longest: usize) -> usize {
    (longest + 2).min(MAX_COLUMN_WIDTH)
}

/// `records.ndjson`, `pivots.json` (pretty) and `summary.json` under `dir`.
pub fn write_json_outputs(
    dir: &Path,
    records: &[RowRecord],
    pivots: &[PivotTable],
    summary: &Summary,
    write_buf: usize,
) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let mut w = NdjsonWriter::create(&dir.join("records.ndjson"), write_buf)?;
    for rec in records {
        w.write_value(&rec.to_json())?;
    }
    w.finish()?;

    let pivots_json: Vec<serde_json::Value> = pivots.iter().map(PivotTable::to_json).collect();
    write_json_pretty(&dir.join("pivots.json"), &pivots_json, write_buf)?;
    write_json_pretty(&dir.join("summary.json"), summary, write_buf)?;
    tracing::info!(dir = %dir.display(), "JSON outputs written");
    Ok(())
}

fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T, write_buf: usize) -> Result<()> {
    let tmp = inprogress_path(path);
    let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
    let mut w = BufWriter::with_capacity(write_buf, f);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.flush()?;
    drop(w);
    replace_file_atomic_backoff(&tmp, path)
}
