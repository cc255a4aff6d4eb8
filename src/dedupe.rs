//! Status-aware duplicate removal over an in-memory record sequence.
//!
//! Records are keyed through a [`KeyExtractor`]; the first record seen for a key
//! holds its position in the output. When a later record shares the key, the pair
//! of statuses decides which one survives (see [`Resolution::between`]).

use crate::key_extractor::KeyExtractor;
use crate::record::{RowRecord, Status};
use ahash::RandomState;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_STATUS_FIELD: &str = "STATUS";

/// Configuration for the duplicate resolver.
#[derive(Clone, Debug)]
pub struct DedupeCfg {
    pub key: KeyExtractor,
    pub status_field: String,
}
impl Default for DedupeCfg {
    fn default() -> Self {
        Self {
            key: KeyExtractor::field("UID"),
            status_field: DEFAULT_STATUS_FIELD.to_string(),
        }
    }
}

/// Counters accumulated over one resolution run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    pub duplicates_found: u64,
    pub duplicates_removed: u64,
    pub pending_removed: u64,
    pub dispose_kept: u64,
}

impl DedupStats {
    fn record(&mut self, res: Resolution) {
        self.duplicates_found += 1;
        match res {
            Resolution::PromoteDispose => {
                self.pending_removed += 1;
                self.dispose_kept += 1;
            }
            Resolution::DropSameStatus => self.duplicates_removed += 1,
            Resolution::DropPending => self.pending_removed += 1,
            Resolution::KeepUnrecognized => {}
        }
    }
}

/// Unique records in first-appearance order plus the run's counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DedupOutcome {
    pub records: Vec<RowRecord>,
    pub stats: DedupStats,
}

/// What happens when an incoming record collides with the kept one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Existing PENDING, incoming DISPOSE: incoming takes the existing slot.
    PromoteDispose,
    /// Both PENDING or both DISPOSE: earliest wins.
    DropSameStatus,
    /// Existing DISPOSE, incoming PENDING.
    DropPending,
    /// Any status outside PENDING/DISPOSE on either side: keep existing, no counter.
    KeepUnrecognized,
}

impl Resolution {
    pub fn between(existing: &Status, incoming: &Status) -> Self {
        match (existing, incoming) {
            (Status::Pending, Status::Dispose) => Resolution::PromoteDispose,
            (Status::Pending, Status::Pending) | (Status::Dispose, Status::Dispose) => Resolution::DropSameStatus,
            (Status::Dispose, Status::Pending) => Resolution::DropPending,
            _ => Resolution::KeepUnrecognized,
        }
    }

    pub fn replaces_existing(self) -> bool {
        matches!(self, Resolution::PromoteDispose)
    }
}

/// Reusable resolver. Every call to [`DuplicateResolver::resolve`] starts from zeroed
/// statistics, so one instance can serve many runs.
#[derive(Clone, Debug, Default)]
pub struct DuplicateResolver {
    cfg: DedupeCfg,
    stats: DedupStats,
}

impl DuplicateResolver {
    pub fn new(cfg: DedupeCfg) -> Self {
        Self { cfg, stats: DedupStats::default() }
    }

    pub fn with_key(key: impl Into<KeyExtractor>) -> Self {
        Self::new(DedupeCfg { key: key.into(), ..Default::default() })
    }

    /// Stats of the most recent run.
    pub fn stats(&self) -> DedupStats { self.stats }

    pub fn reset(&mut self) { self.stats = DedupStats::default(); }

    pub fn resolve<I>(&mut self, records: I) -> DedupOutcome
    where
        I: IntoIterator<Item = RowRecord>,
    {
        self.reset();

        let mut unique: IndexMap<String, RowRecord, RandomState> = IndexMap::with_hasher(RandomState::new());
        let mut seen: u64 = 0;
        let mut skipped: u64 = 0;

        for rec in records {
            seen += 1;
            let Some(key) = self.cfg.key.key_from_record(&rec) else {
                skipped += 1;
                tracing::debug!(key = self.cfg.key.describe(), row = seen, "Record missing key field; skipped");
                continue;
            };

            match unique.entry(key) {
                Entry::Vacant(slot) => { slot.insert(rec); }
                Entry::Occupied(mut slot) => {
                    let res = Resolution::between(
                        &slot.get().status(&self.cfg.status_field),
                        &rec.status(&self.cfg.status_field),
                    );
                    self.stats.record(res);
                    if res.replaces_existing() {
                        // IndexMap keeps the slot position on value replacement.
                        *slot.get_mut() = rec;
                    }
                }
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, key = self.cfg.key.describe(), "Dropped records without a key");
        }
        tracing::info!(
            input = seen,
            unique = unique.len(),
            duplicates_found = self.stats.duplicates_found,
            "Duplicate resolution done"
        );

        DedupOutcome { records: unique.into_values().collect(), stats: self.stats }
    }

    /// Resolve an arbitrary JSON payload. Anything but an array yields an empty
    /// outcome and a warning; array elements that are not objects count as keyless.
    pub fn resolve_json(&mut self, data: &Value) -> DedupOutcome {
        let Some(items) = data.as_array() else {
            self.reset();
            tracing::warn!("Invalid data provided to duplicate resolver: expected an array of records");
            return DedupOutcome::default();
        };
        self.resolve(items.iter().map(|v| RowRecord::from_json(v).unwrap_or_default()))
    }
}

/// One-shot resolution keyed by a single column.
pub fn resolve<I>(records: I, key_field: &str) -> DedupOutcome
where
    I: IntoIterator<Item = RowRecord>,
{
    DuplicateResolver::with_key(key_field).resolve(records)
}
