// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

use super::*;
use serde::{Deserialize, Serialize};
use std::io::Write as _;
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TestEvent {
    Tick { label: String },
    Shutdown,
}

fn tick(label: &str) -> TestEvent {
    TestEvent::Tick { label: label.to_string() }
}

#[test]
fn open_creates_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    let wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    assert!(path.exists());
    assert_eq!(wal.write_seq(), 0);
    assert_eq!(wal.processed_seq(), 0);
}

#[test]
fn append_and_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    let seq1 = wal.append(&tick("cmd1")).unwrap();
    let seq2 = wal.append(&tick("cmd2")).unwrap();
    assert_eq!(seq1, 1);
    assert_eq!(seq2, 2);

    wal.flush().unwrap();
    let metadata = std::fs::metadata(&path).unwrap();
    assert!(metadata.len() > 0);
}

#[test]
fn next_unprocessed_reads_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    wal.append(&tick("cmd1")).unwrap();
    wal.append(&tick("cmd2")).unwrap();

    let entry1 = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry1.seq, 1);
    assert_eq!(entry1.event, tick("cmd1"));

    let entry2 = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry2.seq, 2);
    assert_eq!(entry2.event, tick("cmd2"));

    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn mark_processed_advances_seq() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    wal.append(&tick("cmd1")).unwrap();
    wal.flush().unwrap();

    let entry = wal.next_unprocessed().unwrap().unwrap();
    wal.mark_processed(entry.seq);

    assert_eq!(wal.processed_seq(), 1);
}

#[test]
fn reopen_with_processed_seq_skips_applied_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();
        wal.append(&tick("cmd1")).unwrap();
        wal.append(&tick("cmd2")).unwrap();
        wal.append(&tick("cmd3")).unwrap();
        wal.flush().unwrap();
    }

    let mut wal: Wal<TestEvent> = Wal::open(&path, 2).unwrap();
    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.seq, 3);
    assert_eq!(entry.event, tick("cmd3"));
    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn entries_after_excludes_seq_at_or_below() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    wal.append(&tick("cmd1")).unwrap();
    wal.append(&tick("cmd2")).unwrap();
    wal.append(&tick("cmd3")).unwrap();
    wal.flush().unwrap();

    let entries = wal.entries_after(1).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 2);
    assert_eq!(entries[1].seq, 3);
}

#[test]
fn truncate_before_drops_earlier_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    wal.append(&tick("cmd1")).unwrap();
    wal.append(&tick("cmd2")).unwrap();
    wal.append(&tick("cmd3")).unwrap();
    wal.flush().unwrap();

    wal.truncate_before(2).unwrap();

    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 2);
    assert_eq!(entries[1].seq, 3);
}

/// Control events like `Shutdown` must survive a reopen so a daemon can
/// see and skip them during replay rather than silently losing them.
#[test]
fn shutdown_event_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();
        wal.append(&tick("cmd1")).unwrap();
        wal.append(&TestEvent::Shutdown).unwrap();
        wal.flush().unwrap();
    }

    let mut wal: Wal<TestEvent> = Wal::open(&path, 1).unwrap();
    let entries = wal.entries_after(1).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(matches!(entries[0].event, TestEvent::Shutdown));

    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert!(matches!(entry.event, TestEvent::Shutdown));
    assert!(wal.next_unprocessed().unwrap().is_none());
}

#[test]
fn needs_flush_threshold() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");
    let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    assert!(!wal.needs_flush());

    for i in 0..101 {
        wal.append(&tick(&format!("cmd{i}"))).unwrap();
    }
    assert!(wal.needs_flush());
}

#[test]
fn open_corrupt_wal_creates_bak_and_preserves_valid_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();
        wal.append(&tick("cmd1")).unwrap();
        wal.append(&tick("cmd2")).unwrap();
        wal.flush().unwrap();
    }
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"not-valid-json\n").unwrap();
    }

    let wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    assert_eq!(wal.write_seq(), 2);
    assert!(path.with_extension("bak").exists());

    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
}

#[test]
fn open_corrupt_wal_rotates_bak_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    for i in 1..=4u8 {
        {
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(&[i; 8]).unwrap();
        }
        let wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();
        assert_eq!(wal.write_seq(), 0);
    }

    assert!(path.with_extension("bak").exists());
    assert_eq!(std::fs::read(path.with_extension("bak")).unwrap(), vec![4u8; 8]);
    assert_eq!(std::fs::read(path.with_extension("bak.2")).unwrap(), vec![3u8; 8]);
    assert_eq!(std::fs::read(path.with_extension("bak.3")).unwrap(), vec![2u8; 8]);
    assert!(!path.with_extension("bak.4").exists());
}

#[test]
fn entries_after_stops_at_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    {
        let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();
        wal.append(&tick("cmd1")).unwrap();
        wal.append(&tick("cmd2")).unwrap();
        wal.flush().unwrap();
    }

    let wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();

    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"post-open-corruption\n").unwrap();
    }

    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
}

#[test]
fn next_unprocessed_skips_corrupt_entry_and_resumes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");

    let mut wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();
    wal.append(&tick("cmd1")).unwrap();
    wal.flush().unwrap();

    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.seq, 1);

    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"corrupt-line\n").unwrap();
    }

    assert!(wal.next_unprocessed().unwrap().is_none());

    wal.append(&tick("cmd2")).unwrap();
    wal.flush().unwrap();

    let entry = wal.next_unprocessed().unwrap().unwrap();
    assert_eq!(entry.seq, 2);
}

#[test]
fn open_with_binary_wal_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.wal");
    std::fs::write(&path, b"\x80\x81\x82\xff\xfe\n").unwrap();

    let wal: Wal<TestEvent> = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 0);
    assert!(path.with_extension("bak").exists());
}
