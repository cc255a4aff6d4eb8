mod config;
mod record;
mod key_extractor;

mod dedupe;
mod aggregate;
mod summary;

mod progress;
mod util;
mod ndjson;
mod source;
mod sink;
mod pipeline;

pub use crate::config::{ProcessOptions, KEY_FIELD_ENV};
pub use crate::record::{CellValue, RowRecord, Status};
pub use crate::pipeline::{CaseProcessor, ProcessReport, ProcessedData};

// export KeyExtractor abstraction
pub use crate::key_extractor::KeyExtractor;

// export dedupe engine
pub use crate::dedupe::{resolve, DedupOutcome, DedupStats, DedupeCfg, DuplicateResolver, Resolution, DEFAULT_STATUS_FIELD};

// export pivot engine
pub use crate::aggregate::{
    aggregate, build_pivots, build_pivots_with, default_pivot_configs, Accumulator, AggregationFunction, Metric, PivotConfig, PivotRow,
    PivotTable, TOTAL_LABEL, UNKNOWN_GROUP,
};

pub use crate::summary::{summarize, Summary};

// source / sink plumbing, usable on their own
pub use crate::source::{read_json_array, read_ndjson, read_records, read_workbook, SourceFormat, SourceTable};
pub use crate::sink::{column_width, write_json_outputs, write_workbook};
pub use crate::ndjson::{NdjsonReader, NdjsonWriter};

pub use crate::progress::{make_count_progress, ProgressScope};
pub use crate::util::{create_with_backoff, init_tracing_once, open_with_backoff, replace_file_atomic_backoff};
