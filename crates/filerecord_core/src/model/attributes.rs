//! Per-record typed attribute storage.
//!
//! # Responsibility
//! - Build typed values from a raw input mapping against a schema.
//! - Expose schema-validated `get` / `set` / `unset` accessors.
//!
//! # Invariants
//! - There is exactly one slot per schema field, in schema order.
//! - Input keys outside the schema are discarded, never stored.
//! - Every stored value has the type its field declares.

use super::coerce::coerce;
use super::value::{FieldValue, RawValue};
use crate::schema::Schema;
use log::trace;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Accessor errors for attribute reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The field is not declared by the record's schema.
    UnknownField(String),
    /// A write would change an identifier that is already assigned.
    IdentifierReassigned {
        current: u64,
        requested: Option<String>,
    },
}

impl Display for AttributeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField(field) => write!(f, "unknown field `{field}`"),
            Self::IdentifierReassigned {
                current,
                requested: Some(requested),
            } => write!(
                f,
                "identifier {current} is already assigned; refusing to change it to {requested}"
            ),
            Self::IdentifierReassigned {
                current,
                requested: None,
            } => write!(
                f,
                "identifier {current} is already assigned; refusing to clear it"
            ),
        }
    }
}

impl Error for AttributeError {}

/// Typed field values of one record instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Attributes {
    schema: Arc<Schema>,
    values: Vec<Option<FieldValue>>,
}

impl Attributes {
    /// Creates an attribute set with every field absent.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = vec![None; schema.len()];
        Self { schema, values }
    }

    /// Creates an attribute set from a raw input mapping.
    ///
    /// Keys must match field names exactly. Unknown keys are dropped and a
    /// repeated key keeps its last value.
    pub fn from_input<I, K, V>(schema: Arc<Schema>, input: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RawValue>,
    {
        let mut attributes = Self::new(schema);
        for (key, value) in input {
            let key = key.as_ref();
            match attributes.schema.position(key) {
                Some(index) => attributes.store_at(index, Some(value.into())),
                None => trace!("event=attribute_discard module=model field={key}"),
            }
        }
        attributes
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the value of `field`, or `None` when it is unset.
    pub fn get(&self, field: &str) -> Result<Option<&FieldValue>, AttributeError> {
        let index = self.index_of(field)?;
        Ok(self.values[index].as_ref())
    }

    /// Coerces `value` to the field's declared type and stores it.
    pub fn set(&mut self, field: &str, value: impl Into<RawValue>) -> Result<(), AttributeError> {
        let index = self.index_of(field)?;
        self.store_at(index, Some(value.into()));
        Ok(())
    }

    /// Clears `field`, returning its previous value.
    pub fn unset(&mut self, field: &str) -> Result<Option<FieldValue>, AttributeError> {
        let index = self.index_of(field)?;
        Ok(self.values[index].take())
    }

    pub fn get_str(&self, field: &str) -> Result<Option<&str>, AttributeError> {
        Ok(self.get(field)?.and_then(FieldValue::as_str))
    }

    pub fn get_int(&self, field: &str) -> Result<Option<i64>, AttributeError> {
        Ok(self.get(field)?.and_then(FieldValue::as_i64))
    }

    pub fn get_float(&self, field: &str) -> Result<Option<f64>, AttributeError> {
        Ok(self.get(field)?.and_then(FieldValue::as_f64))
    }

    /// Iterates `(field, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.schema.names().zip(self.values.iter().map(Option::as_ref))
    }

    /// Number of fields that currently hold a value.
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_some()).count()
    }

    fn index_of(&self, field: &str) -> Result<usize, AttributeError> {
        self.schema
            .position(field)
            .ok_or_else(|| AttributeError::UnknownField(field.to_string()))
    }

    fn store_at(&mut self, index: usize, raw: Option<RawValue>) {
        let field_type = self.schema.fields()[index].field_type;
        self.values[index] = coerce(raw.as_ref(), field_type);
    }
}
