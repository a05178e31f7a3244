//! Record type schemas.
//!
//! # Responsibility
//! - Parse `fieldName:fieldType` definitions into an ordered [`Schema`].
//! - Cache loaded schemas per record type (see [`registry`]).
//!
//! # Invariants
//! - Field order is file order and drives serialization order.
//! - Field names are unique identifiers (`[A-Za-z_][A-Za-z0-9_]*`).
//! - A definition without field lines is a valid, empty schema.

pub mod registry;

pub use registry::SchemaRegistry;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Schema loading and validation errors.
#[derive(Debug)]
pub enum SchemaError {
    /// No schema file exists for the record type.
    NotFound { type_name: String, path: PathBuf },
    /// A definition line (or the definition as a whole) is malformed.
    Invalid {
        location: String,
        line: Option<usize>,
        message: String,
    },
    /// A schema for the type is already cached.
    AlreadyRegistered(String),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { type_name, path } => write!(
                f,
                "schema not found for record type `{type_name}` at `{}`",
                path.display()
            ),
            Self::Invalid {
                location,
                line: Some(line),
                message,
            } => write!(f, "invalid schema `{location}` line {line}: {message}"),
            Self::Invalid {
                location,
                line: None,
                message,
            } => write!(f, "invalid schema `{location}`: {message}"),
            Self::AlreadyRegistered(type_name) => {
                write!(f, "schema already registered for record type `{type_name}`")
            }
            Self::Io { path, source } => {
                write!(f, "failed to read schema `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::NotFound { .. } | Self::Invalid { .. } | Self::AlreadyRegistered(_) => None,
        }
    }
}

/// Declared type of one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            _ => None,
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Ordered field-name to type declaration for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    /// Builds a schema from programmatic field declarations.
    ///
    /// # Errors
    /// - Returns [`SchemaError::Invalid`] for non-identifier or duplicated
    ///   names.
    pub fn new<I, N>(fields: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (N, FieldType)>,
        N: Into<String>,
    {
        let mut builder = SchemaBuilder::new("<in-memory>");
        for (name, field_type) in fields {
            builder.push(None, name.into(), field_type)?;
        }
        builder.finish()
    }

    /// Parses schema definition text, one `fieldName:fieldType` per line.
    ///
    /// Blank lines are skipped. `location` only labels error messages.
    pub fn parse(text: &str, location: &str) -> SchemaResult<Self> {
        let mut builder = SchemaBuilder::new(location);
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_no = Some(index + 1);
            let (name, kind) = line
                .split_once(':')
                .ok_or_else(|| builder.invalid(line_no, "expected `fieldName:fieldType`"))?;
            let kind = kind.trim();
            let field_type = FieldType::parse(kind).ok_or_else(|| {
                builder.invalid(
                    line_no,
                    format!("unsupported field type `{kind}`; expected string|integer|float"),
                )
            })?;
            builder.push(line_no, name.trim().to_string(), field_type)?;
        }
        builder.finish()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of `name` in field order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.position(name).map(|index| self.fields[index].field_type)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

struct SchemaBuilder<'a> {
    location: &'a str,
    fields: Vec<FieldDef>,
    seen: HashSet<String>,
}

impl<'a> SchemaBuilder<'a> {
    fn new(location: &'a str) -> Self {
        Self {
            location,
            fields: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn invalid(&self, line: Option<usize>, message: impl Into<String>) -> SchemaError {
        SchemaError::Invalid {
            location: self.location.to_string(),
            line,
            message: message.into(),
        }
    }

    fn push(
        &mut self,
        line: Option<usize>,
        name: String,
        field_type: FieldType,
    ) -> SchemaResult<()> {
        if !FIELD_NAME_RE.is_match(&name) {
            return Err(self.invalid(line, format!("invalid field name `{name}`")));
        }
        if !self.seen.insert(name.clone()) {
            return Err(self.invalid(line, format!("duplicate field `{name}`")));
        }
        self.fields.push(FieldDef { name, field_type });
        Ok(())
    }

    fn finish(self) -> SchemaResult<Schema> {
        Ok(Schema {
            fields: self.fields,
        })
    }
}
