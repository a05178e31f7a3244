//! Record repository contract and flat-file implementation.
//!
//! # Responsibility
//! - Build records from partial input against the type's cached schema.
//! - Read records by identifier and write them back, one file per record.
//!
//! # Invariants
//! - Record files live at `<root>/<subdir>/<id:08>`.
//! - `save` overwrites the record's file; it never removes other files.
//! - `find` reports a missing file as `RecordNotFound` before reading.
//!
//! # See also
//! - [`crate::codec`] for the file format.

use crate::codec::{self, CodecError};
use crate::config::StoreConfig;
use crate::model::attributes::AttributeError;
use crate::model::record::{Record, RecordId, RecordType};
use crate::model::value::RawValue;
use crate::repo::id_alloc::{IdAllocator, ScanAllocator};
use crate::schema::{Schema, SchemaError, SchemaRegistry};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and lookup.
#[derive(Debug)]
pub enum RepoError {
    Schema(SchemaError),
    Attribute(AttributeError),
    RecordNotFound { type_name: String, id: RecordId },
    InvalidData { path: PathBuf, source: CodecError },
    Io { path: PathBuf, source: io::Error },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema(err) => write!(f, "{err}"),
            Self::Attribute(err) => write!(f, "{err}"),
            Self::RecordNotFound { type_name, id } => {
                write!(f, "record not found: {type_name} #{id}")
            }
            Self::InvalidData { path, source } => {
                write!(f, "invalid record data in `{}`: {source}", path.display())
            }
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schema(err) => Some(err),
            Self::Attribute(err) => Some(err),
            Self::RecordNotFound { .. } => None,
            Self::InvalidData { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<SchemaError> for RepoError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<AttributeError> for RepoError {
    fn from(value: AttributeError) -> Self {
        Self::Attribute(value)
    }
}

/// Repository interface for record lookup and persistence.
pub trait RecordRepository {
    /// Returns the schema of `record_type`, loading it on first use.
    fn schema(&self, record_type: &RecordType) -> RepoResult<Arc<Schema>>;

    /// Reads the record stored under `id`.
    fn find(&self, record_type: &RecordType, id: RecordId) -> RepoResult<Record>;

    /// Writes `record`, assigning an identifier first when it has none.
    fn save(&self, record: &mut Record) -> RepoResult<()>;

    /// Builds an unsaved record from partial input.
    ///
    /// Unknown keys are discarded; missing fields stay absent.
    fn build<I, K, V>(&self, record_type: &RecordType, input: I) -> RepoResult<Record>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RawValue>,
    {
        let schema = self.schema(record_type)?;
        Ok(Record::new(record_type.clone(), schema, input))
    }
}

/// Flat-file record repository.
pub struct FileRecordRepository<'reg> {
    config: StoreConfig,
    registry: &'reg SchemaRegistry,
    allocator: Box<dyn IdAllocator>,
}

impl FileRecordRepository<'static> {
    /// Creates a repository backed by the process-wide schema registry.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_registry(config, SchemaRegistry::global())
    }
}

impl<'reg> FileRecordRepository<'reg> {
    /// Creates a repository using an explicitly provided schema registry.
    pub fn with_registry(config: StoreConfig, registry: &'reg SchemaRegistry) -> Self {
        Self {
            config,
            registry,
            allocator: Box::new(ScanAllocator),
        }
    }

    /// Replaces the identifier allocation strategy.
    pub fn with_allocator(mut self, allocator: impl IdAllocator + 'static) -> Self {
        self.allocator = Box::new(allocator);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl RecordRepository for FileRecordRepository<'_> {
    fn schema(&self, record_type: &RecordType) -> RepoResult<Arc<Schema>> {
        Ok(self.registry.load(&self.config, record_type)?)
    }

    fn find(&self, record_type: &RecordType, id: RecordId) -> RepoResult<Record> {
        let started_at = Instant::now();
        let schema = self.schema(record_type)?;
        let path = self.config.record_path(record_type, id);

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(
                    "event=record_find module=repo status=not_found type={} id={}",
                    record_type.name(),
                    id
                );
                return Err(RepoError::RecordNotFound {
                    type_name: record_type.name().to_string(),
                    id,
                });
            }
            Err(err) => {
                error!(
                    "event=record_find module=repo status=error type={} id={} error_code=record_read_failed error={}",
                    record_type.name(),
                    id,
                    err
                );
                return Err(RepoError::Io { path, source: err });
            }
        };

        let fields = match codec::decode(&text) {
            Ok(fields) => fields,
            Err(err) => {
                error!(
                    "event=record_find module=repo status=error type={} id={} error_code=record_decode_failed error={}",
                    record_type.name(),
                    id,
                    err
                );
                return Err(RepoError::InvalidData { path, source: err });
            }
        };

        let mut record = Record::new(record_type.clone(), schema, fields);
        record.assign_id(id);
        info!(
            "event=record_find module=repo status=ok type={} id={} fields={} duration_ms={}",
            record_type.name(),
            id,
            record.attributes().present_count(),
            started_at.elapsed().as_millis()
        );
        Ok(record)
    }

    fn save(&self, record: &mut Record) -> RepoResult<()> {
        let started_at = Instant::now();
        let type_name = record.record_type().name().to_string();
        let dir = self.config.type_dir(record.record_type());

        let id = match record.id() {
            Some(id) => id,
            None => {
                let id = self.allocator.allocate(None, &dir).map_err(|err| {
                    error!(
                        "event=record_save module=repo status=error type={} error_code=id_alloc_failed error={}",
                        type_name, err
                    );
                    RepoError::Io {
                        path: dir.clone(),
                        source: err,
                    }
                })?;
                record.assign_id(id);
                id
            }
        };

        let path = self.config.record_path(record.record_type(), id);
        let encoded = codec::encode(record.attributes());
        if let Err(err) = std::fs::write(&path, encoded) {
            error!(
                "event=record_save module=repo status=error type={} id={} error_code=record_write_failed error={}",
                type_name, id, err
            );
            return Err(RepoError::Io { path, source: err });
        }

        info!(
            "event=record_save module=repo status=ok type={} id={} fields={} duration_ms={}",
            type_name,
            id,
            record.attributes().present_count(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}
