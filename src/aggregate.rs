//! Grouped aggregation ("pivots") over deduplicated records.
//! Describe a pivot with a [`PivotConfig`] and call [`aggregate`], or run a whole
//! list of configs through [`build_pivots`].

use crate::record::{CellValue, RowRecord};
use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Placeholder for a grouping field with no value.
pub const UNKNOWN_GROUP: &str = "Unknown";
/// Value of every grouping field on the synthesized total row.
pub const TOTAL_LABEL: &str = "Total";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationFunction {
    Count,
    Sum,
    Avg,
}

impl AggregationFunction {
    /// Header of the metric column.
    pub fn column(self) -> &'static str {
        match self {
            AggregationFunction::Count => "Count",
            AggregationFunction::Sum => "Sum",
            AggregationFunction::Avg => "Average",
        }
    }
}

/// One pivot: group by `grouping_fields`, reduce `aggregated_field` with `function`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PivotConfig {
    pub name: String,
    pub grouping_fields: Vec<String>,
    pub aggregated_field: String,
    pub function: AggregationFunction,
}

impl PivotConfig {
    pub fn new<I, S>(name: impl Into<String>, grouping_fields: I, aggregated_field: impl Into<String>, function: AggregationFunction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            grouping_fields: grouping_fields.into_iter().map(Into::into).collect(),
            aggregated_field: aggregated_field.into(),
            function,
        }
    }

    pub fn count_by(name: impl Into<String>, field: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self::new(name, [field.into()], key_field, AggregationFunction::Count)
    }
}

/// The five summaries produced for every processed workbook.
pub fn default_pivot_configs() -> Vec<PivotConfig> {
    [
        ("Status Summary", "STATUS"),
        ("Age Category Summary", "AGE CAT1"),
        ("Case Type Summary", "CAT1"),
        ("Stage Summary", "STAGE"),
        ("Side Summary", "SIDE"),
    ]
    .into_iter()
    .map(|(name, field)| PivotConfig::count_by(name, field, "UID"))
    .collect()
}

/// Running count/sum plus the raw values that fed them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Accumulator {
    pub count: u64,
    pub sum: f64,
    pub values: Vec<CellValue>,
}

impl Accumulator {
    /// Null/absent values are ignored; only numbers contribute to `sum`.
    pub fn ingest(&mut self, value: Option<&CellValue>) {
        let Some(v) = value.filter(|v| !v.is_empty()) else { return };
        self.count += 1;
        if let Some(n) = v.as_f64() {
            self.sum += n;
        }
        self.values.push(v.clone());
    }

    pub fn metric(&self, function: AggregationFunction) -> Metric {
        match function {
            AggregationFunction::Count => Metric::Count(self.count),
            AggregationFunction::Sum => Metric::Sum(self.sum),
            AggregationFunction::Avg => Metric::Average(if self.count > 0 { self.sum / self.count as f64 } else { 0.0 }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metric {
    Count(u64),
    Sum(f64),
    Average(f64),
}

impl Metric {
    pub fn as_f64(self) -> f64 {
        match self {
            Metric::Count(n) => n as f64,
            Metric::Sum(x) | Metric::Average(x) => x,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PivotRow {
    /// One value per grouping field, in config order.
    pub group: Vec<String>,
    pub metric: Metric,
}

impl PivotRow {
    pub fn is_total(&self) -> bool {
        !self.group.is_empty() && self.group.iter().all(|g| g == TOTAL_LABEL)
    }
}

/// Grouped rows followed by exactly one total row.
#[derive(Clone, Debug, PartialEq)]
pub struct PivotTable {
    pub name: String,
    pub grouping_fields: Vec<String>,
    pub function: AggregationFunction,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    pub fn headers(&self) -> Vec<String> {
        let mut h = self.grouping_fields.clone();
        h.push(self.function.column().to_string());
        h
    }

    /// Per-group rows (everything but the trailing total).
    pub fn groups(&self) -> &[PivotRow] {
        &self.rows[..self.rows.len().saturating_sub(1)]
    }

    pub fn total(&self) -> Option<&PivotRow> {
        self.rows.last()
    }

    /// Flatten into records keyed by [`PivotTable::headers`].
    pub fn to_records(&self) -> Vec<RowRecord> {
        let metric_col = self.function.column();
        self.rows
            .iter()
            .map(|row| {
                let mut rec: RowRecord = self
                    .grouping_fields
                    .iter()
                    .zip(&row.group)
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect();
                let metric = match row.metric {
                    Metric::Count(n) => CellValue::Number(n as f64),
                    Metric::Sum(x) | Metric::Average(x) => CellValue::Number(x),
                };
                rec.insert(metric_col, metric);
                rec
            })
            .collect()
    }

    pub fn to_json(&self) -> Value {
        let rows: Vec<Value> = self.to_records().iter().map(RowRecord::to_json).collect();
        json!({ "name": self.name, "rows": rows })
    }
}

/// Run one pivot. Returns `None` for an empty record set so the caller can skip
/// the output sheet; a non-empty set always yields at least the total row.
pub fn aggregate(records: &[RowRecord], config: &PivotConfig) -> Option<PivotTable> {
    if records.is_empty() {
        return None;
    }

    let mut groups: IndexMap<Vec<String>, Accumulator, RandomState> = IndexMap::with_hasher(RandomState::new());
    let mut totals = Accumulator::default();

    for rec in records {
        let key: Vec<String> = config
            .grouping_fields
            .iter()
            .map(|field| match rec.value(field) {
                Some(v) => v.to_key_string(),
                None => UNKNOWN_GROUP.to_string(),
            })
            .collect();

        let value = rec.get(&config.aggregated_field);
        groups.entry(key).or_default().ingest(value);
        totals.ingest(value);
    }

    let mut rows: Vec<PivotRow> = groups
        .into_iter()
        .map(|(group, acc)| PivotRow { metric: acc.metric(config.function), group })
        .collect();
    rows.push(PivotRow {
        group: vec![TOTAL_LABEL.to_string(); config.grouping_fields.len()],
        metric: totals.metric(config.function),
    });

    tracing::debug!(pivot = %config.name, rows = rows.len(), "Pivot built");
    Some(PivotTable {
        name: config.name.clone(),
        grouping_fields: config.grouping_fields.clone(),
        function: config.function,
        rows,
    })
}

/// Run every config in order, keeping only the tables that were produced.
pub fn build_pivots(records: &[RowRecord], configs: &[PivotConfig]) -> Vec<PivotTable> {
    build_pivots_with(records, configs, |_| {})
}

/// Like [`build_pivots`], calling `on_done` after each config whether or not it produced a table.
pub fn build_pivots_with<F>(records: &[RowRecord], configs: &[PivotConfig], mut on_done: F) -> Vec<PivotTable>
where
    F: FnMut(&PivotConfig),
{
    configs
        .iter()
        .filter_map(|cfg| {
            let table = aggregate(records, cfg);
            on_done(cfg);
            table
        })
        .collect()
}
