//! Index schema descriptor.
//!
//! The set of fields (and their attributes) the search service stores for each
//! document of an index.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DescriptorError;

/// Primitive field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmType {
    String,
    Int32,
    Int64,
    Double,
    Boolean,
    DateTimeOffset,
}

impl EdmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdmType::String => "Edm.String",
            EdmType::Int32 => "Edm.Int32",
            EdmType::Int64 => "Edm.Int64",
            EdmType::Double => "Edm.Double",
            EdmType::Boolean => "Edm.Boolean",
            EdmType::DateTimeOffset => "Edm.DateTimeOffset",
        }
    }
}

impl FromStr for EdmType {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Edm.String" => Ok(EdmType::String),
            "Edm.Int32" => Ok(EdmType::Int32),
            "Edm.Int64" => Ok(EdmType::Int64),
            "Edm.Double" => Ok(EdmType::Double),
            "Edm.Boolean" => Ok(EdmType::Boolean),
            "Edm.DateTimeOffset" => Ok(EdmType::DateTimeOffset),
            other => Err(DescriptorError::schema(format!("unsupported field type '{}'", other))),
        }
    }
}

/// A field type: a primitive or a collection of one, e.g. `Collection(Edm.String)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldType {
    pub element: EdmType,
    pub collection: bool,
}

impl FieldType {
    pub const STRING: FieldType = FieldType::single(EdmType::String);
    pub const STRING_COLLECTION: FieldType = FieldType::collection_of(EdmType::String);

    pub const fn single(element: EdmType) -> Self {
        Self {
            element,
            collection: false,
        }
    }

    pub const fn collection_of(element: EdmType) -> Self {
        Self {
            element,
            collection: true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.collection {
            write!(f, "Collection({})", self.element.as_str())
        } else {
            write!(f, "{}", self.element.as_str())
        }
    }
}

impl FromStr for FieldType {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => Ok(FieldType::collection_of(inner.parse()?)),
            None => Ok(FieldType::single(s.parse()?)),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = DescriptorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.to_string()
    }
}

/// One field of an index.
///
/// All attribute flags are always sent explicitly so the service echoes them
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default = "default_retrievable")]
    pub retrievable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub facetable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
}

fn default_retrievable() -> bool {
    true
}

impl SearchField {
    /// A retrievable, non-searchable field; attributes can be added with the
    /// chained setters.
    pub fn simple(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            key: false,
            searchable: false,
            filterable: false,
            retrievable: true,
            sortable: false,
            facetable: false,
            analyzer: None,
        }
    }

    /// A full-text searchable field.
    pub fn searchable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            searchable: true,
            ..Self::simple(name, field_type)
        }
    }

    /// The document key: a filterable `Edm.String`.
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            key: true,
            filterable: true,
            ..Self::simple(name, FieldType::STRING)
        }
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn facetable(mut self) -> Self {
        self.facetable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.retrievable = false;
        self
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }
}

/// The fields an index holds per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<SearchField>,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>, fields: Vec<SearchField>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&SearchField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The key field, if exactly one is declared.
    pub fn key_field(&self) -> Option<&SearchField> {
        let mut keys = self.fields.iter().filter(|f| f.key);
        match (keys.next(), keys.next()) {
            (Some(key), None) => Some(key),
            _ => None,
        }
    }

    /// Check the field rules the service enforces on create.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let key_count = self.fields.iter().filter(|f| f.key).count();
        if key_count != 1 {
            return Err(DescriptorError::schema(format!(
                "index '{}' must declare exactly one key field, found {}",
                self.name, key_count
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(DescriptorError::schema(format!(
                    "index '{}' has a field with an empty name",
                    self.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(DescriptorError::schema(format!(
                    "field '{}' is declared more than once",
                    field.name
                )));
            }
            if field.key && field.field_type != FieldType::STRING {
                return Err(DescriptorError::schema(format!(
                    "key field '{}' must be Edm.String, not {}",
                    field.name, field.field_type
                )));
            }
            if field.field_type.collection && field.sortable {
                return Err(DescriptorError::schema(format!(
                    "collection field '{}' cannot be sortable",
                    field.name
                )));
            }
            if field.searchable && field.field_type.element != EdmType::String {
                return Err(DescriptorError::schema(format!(
                    "only string fields can be searchable, '{}' is {}",
                    field.name, field.field_type
                )));
            }
            if field.analyzer.is_some() && !field.searchable {
                return Err(DescriptorError::schema(format!(
                    "field '{}' sets an analyzer but is not searchable",
                    field.name
                )));
            }
        }

        Ok(())
    }

    /// Schema equality over the name and the ordered field definitions.
    pub fn is_satisfied_by(&self, live: &Self) -> bool {
        self.name == live.name && self.fields == live.fields
    }
}
