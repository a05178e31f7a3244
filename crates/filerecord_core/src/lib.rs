//! Flat-file record storage driven by per-type schema files.
//!
//! Records of one type live in `<root>/<type>/`, one file per record named
//! by its zero-padded identifier, next to a `.schema` file declaring the
//! type's fields.

pub mod codec;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;

pub use codec::{decode, encode, CodecError, EscapeError};
pub use config::{StoreConfig, DEFAULT_STORAGE_ROOT, SCHEMA_FILE_NAME, STORAGE_ROOT_ENV};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attributes::{AttributeError, Attributes};
pub use model::coerce::coerce;
pub use model::record::{Record, RecordId, RecordType, ID_FIELD};
pub use model::value::{FieldValue, RawValue};
pub use repo::id_alloc::{ClaimAllocator, IdAllocator, ScanAllocator};
pub use repo::record_repo::{FileRecordRepository, RecordRepository, RepoError, RepoResult};
pub use schema::{FieldDef, FieldType, Schema, SchemaError, SchemaRegistry};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
