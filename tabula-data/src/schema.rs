//! Table/column mapping derived from an entity shape.

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::entity::{Entity, FieldDef, Shape};
use crate::error::ShapeError;

/// One field ↔ column pair of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: &'static str,
    pub column: String,
}

/// Resolved mapping for one entity shape. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    entity: &'static str,
    table_name: String,
    identity_name: String,
    columns: Vec<String>,
    field_mapping: Vec<FieldMapping>,
}

impl SchemaDescriptor {
    /// Derive the descriptor for a shape.
    pub fn describe(shape: &Shape) -> Result<Self, ShapeError> {
        if shape.fields.is_empty() {
            return Err(ShapeError::NoFields { entity: shape.name });
        }
        for (idx, field) in shape.fields.iter().enumerate() {
            if shape.fields[..idx].iter().any(|f| f.name == field.name) {
                return Err(ShapeError::DuplicateField {
                    entity: shape.name,
                    field: field.name,
                });
            }
        }

        let field_mapping: Vec<FieldMapping> = shape
            .fields
            .iter()
            .map(|f| FieldMapping {
                field: f.name,
                column: f.column_name().to_string(),
            })
            .collect();
        let columns = field_mapping.iter().map(|m| m.column.clone()).collect();

        let descriptor = Self {
            entity: shape.name,
            table_name: shape.table.unwrap_or(shape.name).to_string(),
            identity_name: identity_name(shape.fields).to_string(),
            columns,
            field_mapping,
        };
        tracing::debug!(
            entity = descriptor.entity,
            table = %descriptor.table_name,
            identity = %descriptor.identity_name,
            columns = descriptor.columns.len(),
            "described entity shape"
        );
        Ok(descriptor)
    }

    /// Derive the descriptor for an entity type, bypassing any registry.
    pub fn of<T: Entity>() -> Result<Self, ShapeError> {
        Self::describe(&T::shape())
    }

    /// Bare name of the entity type this descriptor was built from.
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Identity column, or `""` when none could be inferred.
    pub fn identity_name(&self) -> &str {
        &self.identity_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn field_mapping(&self) -> &[FieldMapping] {
        &self.field_mapping
    }

    /// Column mapped to the given field.
    pub fn column_of(&self, field: &str) -> Option<&str> {
        self.field_mapping
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.column.as_str())
    }
}

/// Resolve the identity column, first match wins:
///
/// 1. column of the first field carrying a key marker;
/// 2. column of the first field called `id` (any case);
/// 3. column of the first field whose lower-cased name contains `id`.
///
/// The result is always empty or one of the descriptor's columns.
///
/// Rule 3 is a heuristic and will happily pick `valid` or `paid`. Declare a
/// key when that matters.
fn identity_name(fields: &[FieldDef]) -> &'static str {
    if let Some(key) = fields.iter().find(|f| f.key) {
        return key.column_name();
    }
    let lowered: Vec<String> = fields.iter().map(|f| f.name.trim().to_lowercase()).collect();
    if let Some(idx) = lowered.iter().position(|name| name == "id") {
        return fields[idx].column_name();
    }
    if let Some(idx) = lowered.iter().position(|name| name.contains("id")) {
        return fields[idx].column_name();
    }
    ""
}

/// Process-lifetime cache of descriptors keyed by entity type.
///
/// Each type is described at most once per registry; later lookups hand out
/// the shared `Arc`.
#[derive(Default)]
pub struct SchemaRegistry {
    inner: DashMap<TypeId, Arc<SchemaDescriptor>>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by repositories unless told otherwise.
    pub fn global() -> Arc<SchemaRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(SchemaRegistry::new()))
            .clone()
    }

    /// Get the cached descriptor for `T`, describing it on first request.
    pub fn describe<T: Entity>(&self) -> Result<Arc<SchemaDescriptor>, ShapeError> {
        let key = TypeId::of::<T>();
        if let Some(found) = self.inner.get(&key) {
            return Ok(found.value().clone());
        }
        let descriptor = Arc::new(SchemaDescriptor::of::<T>()?);
        // Another thread may have raced us here; keep whichever landed first.
        Ok(self.inner.entry(key).or_insert(descriptor).value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
