use crate::record::RowRecord;
use std::sync::Arc;

/// A reusable key extractor for the duplicate resolver.
///
/// Two flavours:
///  - `field("UID")` reads one column and uses its string form
///  - `by_record(..)` runs a custom closure over the whole record
///
/// Notes:
///  - blank keys (absent, null, whitespace-only text) yield `None`
///  - numbers render without a trailing `.0`, so `1` and `1.0` collide
#[derive(Clone)]
pub enum KeyExtractor {
    Field(String),
    ByRecord(Arc<dyn Fn(&RowRecord) -> Option<String> + Send + Sync>),
}

impl KeyExtractor {
    pub fn field(name: impl Into<String>) -> Self { Self::Field(name.into()) }
    pub fn by_record(f: impl Fn(&RowRecord) -> Option<String> + Send + Sync + 'static) -> Self {
        Self::ByRecord(Arc::new(f))
    }

    /// Extract the dedup key; `None` means the record has no usable key.
    pub fn key_from_record(&self, rec: &RowRecord) -> Option<String> {
        let key = match self {
            KeyExtractor::Field(name) => rec.value(name).map(|c| c.to_key_string()),
            KeyExtractor::ByRecord(f) => f(rec),
        }?;
        if key.trim().is_empty() { None } else { Some(key) }
    }

    /// Human-readable label for logs.
    pub fn describe(&self) -> &str {
        match self {
            KeyExtractor::Field(name) => name,
            KeyExtractor::ByRecord(_) => "<custom>",
        }
    }
}

impl std::fmt::Debug for KeyExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyExtractor({})", self.describe())
    }
}

impl From<&str> for KeyExtractor {
    fn from(name: &str) -> Self { Self::field(name) }
}
impl From<String> for KeyExtractor {
    fn from(name: String) -> Self { Self::field(name) }
}
