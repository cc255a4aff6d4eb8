//! Progress reporting: count-style `indicatif` bars for row reading and sheet writing.

use indicatif::{ProgressBar, ProgressStyle};

/// Count-style progress bar (items processed out of total), with an optional label.
pub fn make_count_progress(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
         rows/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}"
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// A small wrapper so callers can tick unconditionally; a disabled scope
/// is backed by a hidden bar.
pub struct ProgressScope {
    pb: ProgressBar,
}

impl ProgressScope {
    pub fn count<T: Into<String>>(label: T, total: u64, enabled: bool) -> Self {
        let pb = if enabled { make_count_progress(total, &label.into()) } else { ProgressBar::hidden() };
        Self { pb }
    }
    #[inline] pub fn inc(&self, delta: u64) { self.pb.inc(delta); }
    pub fn set_total(&self, total: u64) { self.pb.set_length(total); }
    pub fn finish<T: Into<String>>(&self, msg: T) { self.pb.finish_with_message(msg.into()); }
}
