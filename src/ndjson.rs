use crate::util::{create_with_backoff, open_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder;

/// NDJSON reader with buffering and `\r?\n` trimming.
/// Files ending in `.zst` are decompressed on the fly.
pub struct NdjsonReader {
    rdr: Box<dyn BufRead>,
}

impl NdjsonReader {
    pub fn open(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = open_with_backoff(path, 16, 50)?;
        let cap = buf_bytes.max(8 * 1024);
        let rdr: Box<dyn BufRead> = if is_zst(path) {
            Box::new(BufReader::with_capacity(cap, Decoder::new(f)?))
        } else {
            Box::new(BufReader::with_capacity(cap, f))
        };
        Ok(Self { rdr })
    }

    /// Read the next line into `buf`. Returns the number of bytes read (0 on EOF).
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        buf.clear();
        let n = self.rdr.read_line(buf)?;
        if n == 0 { return Ok(0); }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') { buf.pop(); }
        }
        Ok(n)
    }
}

pub(crate) fn is_zst(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("zst"))
}

/// NDJSON writer that writes to `<path>.inprogress` and promotes on `finish`.
pub struct NdjsonWriter {
    tmp: PathBuf,
    dest: PathBuf,
    w: BufWriter<File>,
}

impl NdjsonWriter {
    pub fn create(path: &Path, buf_bytes: usize) -> Result<Self> {
        let tmp = inprogress_path(path);
        let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        Ok(Self { tmp, dest: path.to_path_buf(), w: BufWriter::with_capacity(buf_bytes.max(8 * 1024), f) })
    }

    #[inline]
    pub fn write_value(&mut self, v: &serde_json::Value) -> Result<()> {
        serde_json::to_writer(&mut self.w, v)?;
        self.w.write_all(b"\n")?;
        Ok(())
    }

    /// Flushes and atomically promotes the temp file to its final path.
    pub fn finish(mut self) -> Result<()> {
        self.w.flush().with_context(|| format!("flush {}", self.tmp.display()))?;
        drop(self.w);
        replace_file_atomic_backoff(&self.tmp, &self.dest)
    }
}

pub(crate) fn inprogress_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".inprogress");
    path.with_file_name(name)
}
