//! Row-level data model shared by the source, the engines and the sink.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use time::macros::format_description;
use time::PrimitiveDateTime;

/// A single typed cell as read from a sheet or a JSON record.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(PrimitiveDateTime),
}

impl CellValue {
    /// Absent/null, or text that is blank after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String form used for keys, grouping and sheet widths.
    /// Integral numbers render without a fractional part (`1.0` -> `1`).
    pub fn to_key_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(dt) => format_date(dt),
        }
    }

    /// Convert a JSON scalar. Nested arrays/objects are kept as their JSON text.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Empty => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Date(dt) => Value::String(format_date(dt)),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self { CellValue::Text(s.to_string()) }
}
impl From<String> for CellValue {
    fn from(s: String) -> Self { CellValue::Text(s) }
}
impl From<f64> for CellValue {
    fn from(n: f64) -> Self { CellValue::Number(n) }
}
impl From<i64> for CellValue {
    fn from(n: i64) -> Self { CellValue::Number(n as f64) }
}
impl From<i32> for CellValue {
    fn from(n: i32) -> Self { CellValue::Number(n as f64) }
}
impl From<PrimitiveDateTime> for CellValue {
    fn from(dt: PrimitiveDateTime) -> Self { CellValue::Date(dt) }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn format_date(dt: &PrimitiveDateTime) -> String {
    let with_time = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let date_only = format_description!("[year]-[month]-[day]");
    let fmt = if dt.time() == time::Time::MIDNIGHT { date_only } else { with_time };
    dt.format(fmt).unwrap_or_else(|_| dt.to_string())
}

/// Case status as used by the duplicate precedence policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Pending,
    Dispose,
    Other(String),
}

impl Status {
    pub const PENDING: &'static str = "PENDING";
    pub const DISPOSE: &'static str = "DISPOSE";

    pub fn from_cell(cell: Option<&CellValue>) -> Self {
        let raw = cell.map(|c| c.to_key_string()).unwrap_or_default();
        match raw.trim() {
            Self::PENDING => Status::Pending,
            Self::DISPOSE => Status::Dispose,
            other => Status::Other(other.to_string()),
        }
    }
}

/// One case row: column name -> cell, in column order.
/// Columns whose cell was empty in the source are simply absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RowRecord {
    cells: IndexMap<String, CellValue>,
}

impl RowRecord {
    pub fn new() -> Self { Self::default() }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Present and non-blank.
    pub fn value(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column).filter(|c| !c.is_blank())
    }

    pub fn status(&self, status_field: &str) -> Status {
        Status::from_cell(self.cells.get(status_field))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize { self.cells.len() }
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    /// Build from a JSON object; `None` for any other JSON shape.
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let mut rec = RowRecord::new();
        for (k, val) in obj {
            if val.is_null() { continue; }
            rec.insert(k.clone(), CellValue::from_json(val));
        }
        Some(rec)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.cells.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for RowRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut rec = RowRecord::new();
        for (k, v) in iter {
            rec.insert(k, v);
        }
        rec
    }
}
