//! Record types and record instances.
//!
//! # Responsibility
//! - Name a record category and its storage subdirectory.
//! - Pair an optional identifier with a schema-shaped attribute set.
//!
//! # Invariants
//! - A record without identifier has never been saved or found.
//! - Once assigned, the identifier never changes.
//! - When the schema declares an `id` field it mirrors the identifier.

use super::attributes::{AttributeError, Attributes};
use super::coerce::{coerce, parse_leading_int};
use super::value::{FieldValue, RawValue};
use crate::schema::Schema;
use std::sync::Arc;

/// Identifier of a stored record; always positive once assigned.
pub type RecordId = u64;

/// Schema field mirrored by the record identifier when declared.
pub const ID_FIELD: &str = "id";

/// A named category of records sharing one schema and one directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordType {
    name: String,
    subdir: String,
}

impl RecordType {
    /// Creates a record type stored under its lower-cased name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let subdir = name.to_lowercase();
        Self { name, subdir }
    }

    /// Overrides the storage subdirectory.
    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = subdir.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subdir(&self) -> &str {
        &self.subdir
    }
}

/// One record instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    record_type: RecordType,
    id: Option<RecordId>,
    attributes: Attributes,
}

impl Record {
    /// Builds an unsaved record from a partial raw input mapping.
    ///
    /// An `id` input (when the schema declares it) that coerces to a
    /// positive integer becomes the record identifier.
    pub fn new<I, K, V>(record_type: RecordType, schema: Arc<Schema>, input: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RawValue>,
    {
        let attributes = Attributes::from_input(schema, input);
        let id = attributes
            .get(ID_FIELD)
            .ok()
            .flatten()
            .and_then(id_from_value);
        Self {
            record_type,
            id,
            attributes,
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// Whether the record still waits for its first `save`.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn schema(&self) -> &Schema {
        self.attributes.schema()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, field: &str) -> Result<Option<&FieldValue>, AttributeError> {
        self.attributes.get(field)
    }

    pub fn get_str(&self, field: &str) -> Result<Option<&str>, AttributeError> {
        self.attributes.get_str(field)
    }

    pub fn get_int(&self, field: &str) -> Result<Option<i64>, AttributeError> {
        self.attributes.get_int(field)
    }

    pub fn get_float(&self, field: &str) -> Result<Option<f64>, AttributeError> {
        self.attributes.get_float(field)
    }

    /// Sets `field`, coercing `value` to its declared type.
    ///
    /// # Errors
    /// - [`AttributeError::UnknownField`] for fields outside the schema.
    /// - [`AttributeError::IdentifierReassigned`] when writing a different
    ///   `id` to a record whose identifier is already assigned.
    pub fn set(&mut self, field: &str, value: impl Into<RawValue>) -> Result<(), AttributeError> {
        let field_type = match self.attributes.schema().field_type(field) {
            Some(field_type) if field == ID_FIELD => field_type,
            _ => return self.attributes.set(field, value),
        };

        let raw = value.into();
        let requested = coerce(Some(&raw), field_type);
        let requested_id = requested.as_ref().and_then(id_from_value);
        match self.id {
            Some(current) if requested_id != Some(current) => {
                Err(AttributeError::IdentifierReassigned {
                    current,
                    requested: requested.map(|value| value.to_text()),
                })
            }
            Some(_) => self.attributes.set(field, raw),
            None => {
                self.attributes.set(field, raw)?;
                self.id = requested_id;
                Ok(())
            }
        }
    }

    /// Clears `field`, returning its previous value.
    pub fn unset(&mut self, field: &str) -> Result<Option<FieldValue>, AttributeError> {
        if field == ID_FIELD && self.attributes.schema().contains(ID_FIELD) {
            if let Some(current) = self.id {
                return Err(AttributeError::IdentifierReassigned {
                    current,
                    requested: None,
                });
            }
        }
        self.attributes.unset(field)
    }

    /// Attaches a persisted identifier, mirroring it into the `id` field.
    pub(crate) fn assign_id(&mut self, id: RecordId) {
        self.id = Some(id);
        if self.attributes.schema().contains(ID_FIELD) {
            let value = i64::try_from(id).unwrap_or(i64::MAX);
            // `id` is declared, so this cannot fail.
            let _ = self.attributes.set(ID_FIELD, value);
        }
    }
}

fn id_from_value(value: &FieldValue) -> Option<RecordId> {
    let id = match value {
        FieldValue::Integer(value) => *value,
        FieldValue::Float(value) => *value as i64,
        FieldValue::Text(value) => parse_leading_int(value),
    };
    RecordId::try_from(id).ok().filter(|id| *id > 0)
}
