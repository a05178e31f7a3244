//! In-memory record model.
//!
//! # Responsibility
//! - Represent raw input values and typed field values.
//! - Coerce raw input into declared field types without failing.
//! - Hold per-record attributes keyed exactly by the schema's fields.
//!
//! # Invariants
//! - An attribute set always has one slot per schema field, no more.
//! - Identifiers are immutable once assigned to a record.

pub mod attributes;
pub mod coerce;
pub mod record;
pub mod value;
