//! Storage root convention and on-disk layout.
//!
//! # Responsibility
//! - Resolve the storage root (default `db`, overridable via `FILERECORD_ROOT`).
//! - Derive per-type directories, schema paths and record file paths.
//!
//! # Invariants
//! - Record files are named by their identifier zero-padded to 8 digits.
//! - A type's schema file lives next to its records as `.schema`.

use crate::model::record::{RecordId, RecordType};
use std::path::{Path, PathBuf};

/// Storage root used when nothing else is configured.
pub const DEFAULT_STORAGE_ROOT: &str = "db";
/// Environment variable consulted by [`StoreConfig::from_env`].
pub const STORAGE_ROOT_ENV: &str = "FILERECORD_ROOT";
/// File name of the per-type schema definition.
pub const SCHEMA_FILE_NAME: &str = ".schema";

const RECORD_ID_WIDTH: usize = 8;

/// Location of the record store on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding one subdirectory per record type.
    pub root: PathBuf,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads the storage root from `FILERECORD_ROOT`, falling back to `db`.
    pub fn from_env() -> Self {
        match std::env::var_os(STORAGE_ROOT_ENV) {
            Some(value) if !value.is_empty() => Self::new(value),
            _ => Self::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every record of `record_type`.
    pub fn type_dir(&self, record_type: &RecordType) -> PathBuf {
        self.root.join(record_type.subdir())
    }

    pub fn schema_path(&self, record_type: &RecordType) -> PathBuf {
        self.type_dir(record_type).join(SCHEMA_FILE_NAME)
    }

    pub fn record_path(&self, record_type: &RecordType, id: RecordId) -> PathBuf {
        self.type_dir(record_type).join(record_file_name(id))
    }

    /// Creates the type directory (and the root) when missing.
    ///
    /// The store itself never creates directories; this is for embedders
    /// provisioning a new record type together with its schema file.
    pub fn ensure_type_dir(&self, record_type: &RecordType) -> std::io::Result<PathBuf> {
        let dir = self.type_dir(record_type);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_ROOT)
    }
}

/// Renders an identifier as a record file name (`7` -> `00000007`).
pub fn record_file_name(id: RecordId) -> String {
    format!("{id:0width$}", width = RECORD_ID_WIDTH)
}
