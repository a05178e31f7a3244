//! Process-scoped schema cache keyed by resolved schema path.
//!
//! # Invariants
//! - A type's schema file is read at most once per registry.
//! - Types sharing a name under different roots or subdirectories never
//!   share a cache entry.
//! - Cached entries are never replaced or evicted.

use super::{Schema, SchemaError, SchemaResult};
use crate::config::StoreConfig;
use crate::model::record::RecordType;
use log::{debug, error, info};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

static GLOBAL_REGISTRY: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::new);

/// Lazily populated schema table.
///
/// The mutex only exists so the process-wide instance can live in a static;
/// callers are expected to be single-threaded.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Mutex<HashMap<PathBuf, Arc<Schema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry used by default repositories.
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL_REGISTRY
    }

    /// Returns the schema of `record_type`, reading its `.schema` file on
    /// first use.
    ///
    /// # Errors
    /// - [`SchemaError::NotFound`] when the schema file does not exist.
    /// - [`SchemaError::Invalid`] when the file is malformed.
    /// - [`SchemaError::Io`] for any other read failure.
    pub fn load(&self, config: &StoreConfig, record_type: &RecordType) -> SchemaResult<Arc<Schema>> {
        let path = config.schema_path(record_type);
        if let Some(schema) = self.cached(&path) {
            debug!(
                "event=schema_load module=schema status=cached type={}",
                record_type.name()
            );
            return Ok(schema);
        }

        let started_at = Instant::now();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                error!(
                    "event=schema_load module=schema status=error type={} error_code=schema_not_found path={}",
                    record_type.name(),
                    path.display()
                );
                return Err(SchemaError::NotFound {
                    type_name: record_type.name().to_string(),
                    path,
                });
            }
            Err(err) => {
                error!(
                    "event=schema_load module=schema status=error type={} error_code=schema_read_failed error={}",
                    record_type.name(),
                    err
                );
                return Err(SchemaError::Io { path, source: err });
            }
        };

        let parsed = Schema::parse(&text, &path.display().to_string()).map_err(|err| {
            error!(
                "event=schema_load module=schema status=error type={} error_code=schema_invalid error={}",
                record_type.name(),
                err
            );
            err
        })?;

        let schema = self
            .lock()
            .entry(path)
            .or_insert_with(|| Arc::new(parsed))
            .clone();
        info!(
            "event=schema_load module=schema status=ok type={} fields={} duration_ms={}",
            record_type.name(),
            schema.len(),
            started_at.elapsed().as_millis()
        );
        Ok(schema)
    }

    /// Seeds the cache for `record_type` under `config` without touching
    /// the filesystem.
    ///
    /// # Errors
    /// - [`SchemaError::AlreadyRegistered`] when the type is already cached.
    pub fn register(
        &self,
        config: &StoreConfig,
        record_type: &RecordType,
        schema: Schema,
    ) -> SchemaResult<Arc<Schema>> {
        let mut schemas = self.lock();
        let path = config.schema_path(record_type);
        if schemas.contains_key(&path) {
            return Err(SchemaError::AlreadyRegistered(record_type.name().to_string()));
        }
        let schema = Arc::new(schema);
        schemas.insert(path, Arc::clone(&schema));
        Ok(schema)
    }

    /// Returns the cached schema of `record_type` under `config`, if any.
    pub fn get(&self, config: &StoreConfig, record_type: &RecordType) -> Option<Arc<Schema>> {
        self.cached(&config.schema_path(record_type))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn cached(&self, path: &Path) -> Option<Arc<Schema>> {
        self.lock().get(path).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Schema>>> {
        self.schemas.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
