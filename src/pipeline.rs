use crate::aggregate::{build_pivots_with, PivotConfig, PivotTable};
use crate::config::ProcessOptions;
use crate::dedupe::{DedupeCfg, DedupStats, DuplicateResolver};
use crate::key_extractor::KeyExtractor;
use crate::progress::ProgressScope;
use crate::record::RowRecord;
use crate::sink::{write_json_outputs, write_workbook};
use crate::source::read_records;
use crate::summary::{summarize, Summary};
use crate::util::init_tracing_once;
use anyhow::Result;
use std::path::Path;
use time::Date;

/// Builder-style entry point: configure, then `process_records` or `process_file`.
#[derive(Clone, Debug, Default)]
pub struct CaseProcessor {
    pub(crate) opts: ProcessOptions,
}

/// Everything one run produces, before anything is persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedData {
    pub unique: Vec<RowRecord>,
    pub stats: DedupStats,
    pub pivots: Vec<PivotTable>,
    pub summary: Summary,
}

/// What `process_file` reports back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessReport {
    pub total_records: u64,
    pub unique_records: u64,
    pub stats: DedupStats,
    pub summary: Summary,
    /// Names of the pivot sheets written, in order.
    pub pivots_written: Vec<String>,
}

impl CaseProcessor {
    pub fn new() -> Self {
        Self { opts: ProcessOptions::default() }
    }

    pub fn with_options(opts: ProcessOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ProcessOptions { &self.opts }

    // -------- Builder methods --------
    pub fn key_field(mut self, field: impl AsRef<str>) -> Self { self.opts = self.opts.with_key_field(field); self }
    pub fn status_field(mut self, field: impl AsRef<str>) -> Self { self.opts = self.opts.with_status_field(field); self }
    pub fn category_field(mut self, field: impl AsRef<str>) -> Self { self.opts = self.opts.with_category_field(field); self }
    pub fn age_field(mut self, field: impl AsRef<str>) -> Self { self.opts = self.opts.with_age_field(field); self }
    pub fn category_patterns(mut self, civil: &str, criminal: &str) -> Result<Self> { self.opts = self.opts.with_category_patterns(civil, criminal)?; Ok(self) }
    pub fn as_of(mut self, date: Date) -> Self { self.opts = self.opts.with_as_of(date); self }
    pub fn pivots(mut self, pivots: Vec<PivotConfig>) -> Self { self.opts = self.opts.with_pivots(pivots); self }
    pub fn data_sheet_name(mut self, name: impl Into<String>) -> Self { self.opts = self.opts.with_data_sheet_name(name); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    // -------- Operations --------

    /// Dedup -> pivots -> summary. Engine state is created fresh for every call.
    pub fn process_records(&self, records: Vec<RowRecord>) -> ProcessedData {
        let total_input = records.len() as u64;

        let mut resolver = DuplicateResolver::new(DedupeCfg {
            key: KeyExtractor::field(&self.opts.key_field),
            status_field: self.opts.status_field.clone(),
        });
        let outcome = resolver.resolve(records);

        let pb = ProgressScope::count("Building pivots", self.opts.pivots.len() as u64, self.opts.progress);
        let pivots = build_pivots_with(&outcome.records, &self.opts.pivots, |_| pb.inc(1));
        pb.finish(format!("{} pivots", pivots.len()));
        if pivots.len() < self.opts.pivots.len() {
            tracing::info!("No records left after deduplication; pivot sheets skipped");
        }

        let summary = summarize(&outcome.records, total_input, &outcome.stats, &self.opts);
        ProcessedData { unique: outcome.records, stats: outcome.stats, pivots, summary }
    }

    /// Read `input`, process it and write the cleaned workbook to `output`.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<ProcessReport> {
        let (report, _) = self.run_file(input, output)?;
        Ok(report)
    }

    /// Like `process_file`, additionally writing `records.ndjson`, `pivots.json`
    /// and `summary.json` into `json_dir`.
    pub fn process_file_with_json(&self, input: &Path, output: &Path, json_dir: &Path) -> Result<ProcessReport> {
        let (report, data) = self.run_file(input, output)?;
        write_json_outputs(json_dir, &data.unique, &data.pivots, &data.summary, self.opts.write_buffer_bytes)?;
        Ok(report)
    }

    fn run_file(&self, input: &Path, output: &Path) -> Result<(ProcessReport, ProcessedData)> {
        init_tracing_once();
        let table = read_records(input, &self.opts)?;
        let data = self.process_records(table.records);

        write_workbook(output, &self.opts.data_sheet_name, &table.headers, &data.unique, &data.pivots)?;

        let report = ProcessReport {
            total_records: data.summary.total_records_processed,
            unique_records: data.unique.len() as u64,
            stats: data.stats,
            summary: data.summary.clone(),
            pivots_written: data.pivots.iter().map(|p| p.name.clone()).collect(),
        };
        Ok((report, data))
    }
}
