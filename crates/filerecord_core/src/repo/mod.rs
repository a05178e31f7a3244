//! Record persistence over per-type directories of flat files.
//!
//! # Responsibility
//! - Define the record repository contract (`build`, `find`, `save`).
//! - Allocate identifiers for records saved for the first time.
//!
//! # Invariants
//! - `find` never returns a record without identifier.
//! - `save` of a record with identifier never consults the allocator.
//! - Repository APIs return semantic errors (`RecordNotFound`) in addition
//!   to filesystem transport errors.

pub mod id_alloc;
pub mod record_repo;
