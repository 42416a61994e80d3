//! User-defined schema fields and compilation to an API schema descriptor.
//!
//! The field store backs the schema-builder UI: an ordered list of
//! (name, type) slots the user edits freely, with blank names allowed.
//! Compilation filters the blanks and produces the JSON-Schema-like object
//! the extraction API accepts as a structured-output constraint.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Maximum number of schema fields a single session may declare.
pub const MAX_FIELDS: usize = 5;

/// Scalar type a schema field can take.
///
/// Wire tokens (`str`, `bool`, `int`, `float`) match what the UI shows in
/// its type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Str,
    Bool,
    Int,
    Float,
}

impl FieldType {
    /// JSON-Schema type keyword for this scalar type.
    pub fn json_type(self) -> &'static str {
        match self {
            FieldType::Str => "string",
            FieldType::Bool => "boolean",
            FieldType::Int => "integer",
            FieldType::Float => "number",
        }
    }
}

/// One editable (name, type) slot in the schema builder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// A freshly added, unnamed string field.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Whether the field has a usable (non-whitespace) name.
    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Schema constraint for one output property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub json_type: String,
}

/// JSON-Schema-like descriptor sent to the extraction API.
///
/// Serializes as `{"type": "object", "properties": {...}, "required": [...]}`
/// with properties in first-seen field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    #[serde(rename = "type")]
    pub object_type: String,
    pub properties: IndexMap<String, PropertySchema>,
    pub required: Vec<String>,
}

impl SchemaDescriptor {
    /// Number of declared properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Ordered, session-scoped list of schema fields.
///
/// Invariants: never empty (at least one slot, possibly blank) and never
/// longer than [`MAX_FIELDS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFieldStore {
    fields: Vec<SchemaField>,
}

impl Default for SchemaFieldStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaFieldStore {
    /// A store with a single blank field, the schema builder's initial state.
    pub fn new() -> Self {
        Self {
            fields: vec![SchemaField::blank()],
        }
    }

    /// Current field slots in display order.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        false // invariant: at least one slot
    }

    /// Whether the UI should still offer the add affordance.
    pub fn can_add(&self) -> bool {
        self.fields.len() < MAX_FIELDS
    }

    /// Whether the UI should offer the remove affordance.
    pub fn can_remove(&self) -> bool {
        self.fields.len() > 1
    }

    /// Append a blank field slot. Returns `false` (no-op) once the store
    /// holds [`MAX_FIELDS`] fields.
    pub fn add_field(&mut self) -> bool {
        if !self.can_add() {
            return false;
        }
        self.fields.push(SchemaField::blank());
        true
    }

    /// Remove the field at `index`. Returns `false` (no-op) when the index
    /// is out of range or the field is the last remaining slot.
    pub fn remove_field(&mut self, index: usize) -> bool {
        if !self.can_remove() || index >= self.fields.len() {
            return false;
        }
        self.fields.remove(index);
        true
    }

    /// Overwrite the field at `index` in place. Returns `false` when the
    /// index is out of range.
    pub fn update_field(&mut self, index: usize, name: impl Into<String>, field_type: FieldType) -> bool {
        match self.fields.get_mut(index) {
            Some(field) => {
                field.name = name.into();
                field.field_type = field_type;
                true
            }
            None => false,
        }
    }

    /// Compile the current fields into a schema descriptor.
    ///
    /// Fields with blank (empty or whitespace-only) names are dropped.
    /// Returns `None` when nothing remains, meaning the extraction request
    /// should omit structured-output constraints entirely. Duplicate names
    /// are last-write-wins: a later duplicate overwrites the earlier
    /// entry's type but keeps its first-seen position.
    pub fn compile(&self) -> Option<SchemaDescriptor> {
        let mut properties: IndexMap<String, PropertySchema> = IndexMap::new();
        for field in &self.fields {
            if !field.is_named() {
                continue;
            }
            properties.insert(
                field.name.trim().to_string(),
                PropertySchema {
                    json_type: field.field_type.json_type().to_string(),
                },
            );
        }

        if properties.is_empty() {
            return None;
        }

        let required = properties.keys().cloned().collect();
        Some(SchemaDescriptor {
            object_type: "object".to_string(),
            properties,
            required,
        })
    }
}
