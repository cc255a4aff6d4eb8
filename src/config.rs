use crate::aggregate::{default_pivot_configs, PivotConfig};
use crate::dedupe::DEFAULT_STATUS_FIELD;
use anyhow::{Context, Result};
use regex::Regex;
use time::Date;

/// Env override for the dedup key column.
pub const KEY_FIELD_ENV: &str = "CASEPROC_KEY_FIELD";

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct ProcessOptions {
    pub key_field: String,            // dedup key column
    pub status_field: String,         // PENDING / DISPOSE column
    pub category_field: String,       // civil vs criminal
    pub age_field: String,            // years, or a filing date
    pub civil_pattern: Regex,
    pub criminal_pattern: Regex,
    pub as_of: Option<Date>,          // reference date for date ages; None = today (UTC)
    pub pivots: Vec<PivotConfig>,
    pub data_sheet_name: String,      // sheet holding the deduplicated rows
    pub progress: bool,               // show progress bar
    pub progress_label: Option<String>,

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            key_field: "UID".to_string(),
            status_field: DEFAULT_STATUS_FIELD.to_string(),
            category_field: "CAT1".to_string(),
            age_field: "AGE".to_string(),
            civil_pattern: Regex::new(r"(?i)\bciv").expect("static regex"),
            criminal_pattern: Regex::new(r"(?i)\bcri").expect("static regex"),
            as_of: None,
            pivots: default_pivot_configs(),
            data_sheet_name: "Processed Data".to_string(),
            progress: true,
            progress_label: None,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl ProcessOptions {
    /// Defaults, then `CASEPROC_KEY_FIELD` if set and non-blank.
    pub fn from_env() -> Self {
        let opts = Self::default();
        match std::env::var(KEY_FIELD_ENV) {
            Ok(k) if !k.trim().is_empty() => opts.with_key_field(k),
            _ => opts,
        }
    }

    /// Also retargets pivots that were counting the previous key column.
    pub fn with_key_field(mut self, field: impl AsRef<str>) -> Self {
        let old = std::mem::replace(&mut self.key_field, field.as_ref().trim().to_string());
        for p in self.pivots.iter_mut().filter(|p| p.aggregated_field == old) {
            p.aggregated_field = self.key_field.clone();
        }
        self
    }
    pub fn with_status_field(mut self, field: impl AsRef<str>) -> Self {
        self.status_field = field.as_ref().trim().to_string();
        self
    }
    pub fn with_category_field(mut self, field: impl AsRef<str>) -> Self {
        self.category_field = field.as_ref().trim().to_string();
        self
    }
    pub fn with_age_field(mut self, field: impl AsRef<str>) -> Self {
        self.age_field = field.as_ref().trim().to_string();
        self
    }
    pub fn with_category_patterns(mut self, civil: &str, criminal: &str) -> Result<Self> {
        self.civil_pattern = Regex::new(civil).with_context(|| format!("civil pattern {civil:?}"))?;
        self.criminal_pattern = Regex::new(criminal).with_context(|| format!("criminal pattern {criminal:?}"))?;
        Ok(self)
    }
    pub fn with_as_of(mut self, date: Date) -> Self {
        self.as_of = Some(date);
        self
    }
    pub fn with_pivots(mut self, pivots: Vec<PivotConfig>) -> Self {
        self.pivots = pivots;
        self
    }
    pub fn with_data_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.data_sheet_name = name.into();
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }

    // IO buffers tuning
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
}
