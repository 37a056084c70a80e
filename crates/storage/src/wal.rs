// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Append-only, newline-delimited JSON write-ahead log.
//!
//! Each line is one `WalEntry<E>`. Recovery replays entries with
//! `seq > processed_seq` against a snapshot of materialized state. A
//! corrupt tail (partial write from a crash mid-append, or non-UTF-8
//! garbage) is tolerated: `open` rotates it out to a `.bak` file and
//! keeps every entry that parsed before the first bad line.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One logged event plus its monotonic sequence number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry<E> {
    pub seq: u64,
    pub event: E,
}

const FLUSH_THRESHOLD: usize = 100;
const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
/// Keeps up to [`MAX_BAK_FILES`] backups; the oldest is evicted.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| if n == 1 { path.with_extension("bak") } else { path.with_extension(format!("bak.{n}")) };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

/// A write-ahead log of events of type `E`.
pub struct Wal<E> {
    path: PathBuf,
    file: File,
    write_seq: u64,
    processed_seq: u64,
    /// Byte offset of the next line [`Wal::next_unprocessed`] will read.
    read_pos: u64,
    unflushed: usize,
    last_flush: std::time::Instant,
    _marker: std::marker::PhantomData<E>,
}

impl<E> Wal<E>
where
    E: Serialize + DeserializeOwned + Clone,
{
    /// Open (creating if absent) the WAL at `path`. `processed_seq` is the
    /// sequence number a snapshot loaded alongside this WAL was taken at;
    /// `next_unprocessed` starts past every entry at or below it.
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        let (mut entries, had_corruption) = Self::read_valid_prefix(path)?;
        let write_seq = entries.last().map(|(_, e)| e.seq).unwrap_or(0);

        if had_corruption {
            let bak = rotate_bak_path(path);
            if path.exists() {
                fs::rename(path, &bak)?;
            }
            let mut clean = File::create(path)?;
            entries.clear();
            let (original_entries, _) = Self::read_valid_prefix(&bak)?;
            for (_, entry) in &original_entries {
                let line = serde_json::to_string(entry)?;
                writeln!(clean, "{line}")?;
                entries.push((line.len() as u64 + 1, entry.clone()));
            }
            clean.flush()?;
        }

        let mut read_pos = 0u64;
        for (len, entry) in &entries {
            if entry.seq <= processed_seq {
                read_pos += len;
            } else {
                break;
            }
        }

        let file = OpenOptions::new().append(true).read(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            write_seq,
            processed_seq,
            read_pos,
            unflushed: 0,
            last_flush: std::time::Instant::now(),
            _marker: std::marker::PhantomData,
        })
    }

    /// Parse every line in `path` as a `WalEntry<E>`, pairing each with
    /// its on-disk byte length (including the newline), and stop at the
    /// first line that fails to decode. An absent file yields no entries
    /// and no corruption.
    fn read_valid_prefix(path: &Path) -> Result<(Vec<(u64, WalEntry<E>)>, bool), WalError> {
        if !path.exists() {
            return Ok((Vec::new(), false));
        }
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut corrupted = false;

        loop {
            let mut raw = Vec::new();
            let n = reader.read_until(b'\n', &mut raw)?;
            if n == 0 {
                break;
            }
            if raw == [b'\n'] {
                continue;
            }
            let text = match std::str::from_utf8(trim_newline(&raw)) {
                Ok(t) => t,
                Err(_) => {
                    corrupted = true;
                    break;
                }
            };
            match serde_json::from_str::<WalEntry<E>>(text) {
                Ok(entry) => entries.push((n as u64, entry)),
                Err(_) => {
                    corrupted = true;
                    break;
                }
            }
        }
        Ok((entries, corrupted))
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Append `event`, returning its assigned sequence number. Buffered
    /// until [`Wal::flush`] or the flush threshold is crossed.
    pub fn append(&mut self, event: &E) -> Result<u64, WalError> {
        self.write_seq += 1;
        let entry = WalEntry { seq: self.write_seq, event };
        writeln!(self.file, "{}", serde_json::to_string(&entry)?)?;
        self.unflushed += 1;
        Ok(self.write_seq)
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_data()?;
        self.unflushed = 0;
        self.last_flush = std::time::Instant::now();
        Ok(())
    }

    /// Whether buffered writes or elapsed time warrant a flush.
    pub fn needs_flush(&self) -> bool {
        self.unflushed >= FLUSH_THRESHOLD || (self.unflushed > 0 && self.last_flush.elapsed().as_millis() >= 500)
    }

    /// Read and return the next entry past the internal read cursor,
    /// advancing it. Returns `None` both at end-of-file and when the
    /// next line is corrupt — in the latter case the cursor still
    /// advances past the bad line, so a later call can reach whatever
    /// follows it.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry<E>>, WalError> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.read_pos))?;
        let mut reader = BufReader::new(file);

        let mut raw = Vec::new();
        let n = reader.read_until(b'\n', &mut raw)?;
        if n == 0 {
            return Ok(None);
        }

        self.read_pos += n as u64;
        let parsed = std::str::from_utf8(trim_newline(&raw)).ok().and_then(|t| serde_json::from_str::<WalEntry<E>>(t).ok());
        Ok(parsed)
    }

    /// Mark `seq` as processed so a subsequent snapshot can record it as
    /// the recovery point.
    pub fn mark_processed(&mut self, seq: u64) {
        if seq > self.processed_seq {
            self.processed_seq = seq;
        }
    }

    /// Read every valid entry with `seq > after` from the start of the
    /// file, stopping at the first line that fails to parse.
    pub fn entries_after(&self, after: u64) -> Result<Vec<WalEntry<E>>, WalError> {
        let (entries, _) = Self::read_valid_prefix(&self.path)?;
        Ok(entries.into_iter().map(|(_, e)| e).filter(|e| e.seq > after).collect())
    }

    /// Rewrite the file keeping only entries with `seq >= floor`,
    /// reclaiming space after a snapshot makes older entries redundant.
    pub fn truncate_before(&mut self, floor: u64) -> Result<(), WalError> {
        let kept = self.entries_after(floor.saturating_sub(1))?;
        let mut file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        for entry in &kept {
            writeln!(file, "{}", serde_json::to_string(entry)?)?;
        }
        file.flush()?;
        self.read_pos = 0;
        for entry in &kept {
            if entry.seq <= self.processed_seq {
                self.read_pos += serde_json::to_string(entry)?.len() as u64 + 1;
            }
        }
        Ok(())
    }
}

fn trim_newline(raw: &[u8]) -> &[u8] {
    if raw.last() == Some(&b'\n') { &raw[..raw.len() - 1] } else { raw }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
