//! Identifier allocation by directory scan.
//!
//! # Invariants
//! - A present identifier is returned unchanged.
//! - A fresh identifier is one greater than the largest stored one; gaps are
//!   never reused.
//!
//! [`ScanAllocator`] does not coordinate with other writers: two processes
//! saving new records of the same type at once may receive the same id.
//! [`ClaimAllocator`] closes that window by creating the record file
//! exclusively before handing out its id.

use crate::config::record_file_name;
use crate::model::coerce::parse_leading_int;
use crate::model::record::RecordId;
use log::debug;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

const DEFAULT_CLAIM_ATTEMPTS: usize = 64;

/// Strategy producing identifiers for new records.
pub trait IdAllocator {
    /// Computes a fresh identifier for a record stored in `dir`.
    fn next_id(&self, dir: &Path) -> io::Result<RecordId>;

    /// Returns `existing` when set (non-zero), else a fresh identifier.
    fn allocate(&self, existing: Option<RecordId>, dir: &Path) -> io::Result<RecordId> {
        match existing.filter(|id| *id > 0) {
            Some(id) => Ok(id),
            None => self.next_id(dir),
        }
    }
}

/// Returns `max(stored ids) + 1` without reserving anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanAllocator;

impl IdAllocator for ScanAllocator {
    fn next_id(&self, dir: &Path) -> io::Result<RecordId> {
        Ok(max_stored_id(dir)?.saturating_add(1))
    }
}

/// Scans like [`ScanAllocator`], then claims the candidate file with an
/// exclusive create, moving to the next candidate when it already exists.
///
/// The claimed file is left empty until the record is written.
#[derive(Debug, Clone, Copy)]
pub struct ClaimAllocator {
    max_attempts: usize,
}

impl ClaimAllocator {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for ClaimAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_CLAIM_ATTEMPTS)
    }
}

impl IdAllocator for ClaimAllocator {
    fn next_id(&self, dir: &Path) -> io::Result<RecordId> {
        let mut candidate = max_stored_id(dir)?.saturating_add(1);
        for _ in 0..self.max_attempts {
            let path = dir.join(record_file_name(candidate));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(candidate),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(
                        "event=id_claim module=repo status=retry candidate={} path={}",
                        candidate,
                        path.display()
                    );
                    candidate = candidate.saturating_add(1);
                }
                Err(err) => return Err(err),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "could not claim a record id in `{}` after {} attempts",
                dir.display(),
                self.max_attempts
            ),
        ))
    }
}

/// Largest identifier stored in `dir`, or `0` when there is none.
///
/// Hidden entries (such as `.schema`) are skipped and names without a
/// leading number count as `0`. A missing directory holds no records.
pub fn max_stored_id(dir: &Path) -> io::Result<RecordId> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    let mut max_id: RecordId = 0;
    for entry in entries {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let id = RecordId::try_from(parse_leading_int(&name)).unwrap_or(0);
        max_id = max_id.max(id);
    }
    Ok(max_id)
}
