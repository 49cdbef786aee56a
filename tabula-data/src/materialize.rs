use serde::Deserialize;

use crate::entity::Entity;
use crate::error::{DataError, FieldAssignmentError};
use crate::executor::Cursor;
use crate::schema::SchemaDescriptor;

/// What to do when a column value cannot be written into its field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentPolicy {
    /// Leave the field at its default, count the miss and carry on.
    #[default]
    Lenient,
    /// Fail the whole read on the first bad field.
    Strict,
}

/// Turns cursor rows into entities using a descriptor's field mapping.
#[derive(Debug, Default)]
pub struct Materializer {
    policy: AssignmentPolicy,
    skipped: u64,
}

impl Materializer {
    pub fn new(policy: AssignmentPolicy) -> Self {
        Self { policy, skipped: 0 }
    }

    pub fn policy(&self) -> AssignmentPolicy {
        self.policy
    }

    /// Total fields left unset by lenient assignment since the last reset.
    pub fn skipped_fields(&self) -> u64 {
        self.skipped
    }

    pub fn reset_skipped(&mut self) {
        self.skipped = 0;
    }

    /// Build an entity from the cursor's current row.
    ///
    /// Returns `Ok(None)` when the cursor is not on a row. Columns missing
    /// from the result and `NULL` cells are skipped silently; the field keeps
    /// its `Default` value.
    pub fn materialize_one<T, C>(
        &mut self,
        cursor: &C,
        descriptor: &SchemaDescriptor,
    ) -> Result<Option<T>, DataError>
    where
        T: Entity,
        C: Cursor + ?Sized,
    {
        if !cursor.has_row() {
            return Ok(None);
        }

        let mut entity = T::default();
        for mapping in descriptor.field_mapping() {
            let Some(ordinal) = cursor.ordinal(&mapping.column) else {
                continue;
            };
            let value = match cursor.value(ordinal) {
                Some(value) if !value.is_null() => value,
                _ => continue,
            };
            if let Err(source) = entity.assign(mapping.field, value) {
                let err = FieldAssignmentError {
                    entity: descriptor.entity(),
                    field: mapping.field,
                    column: mapping.column.clone(),
                    source,
                };
                match self.policy {
                    AssignmentPolicy::Strict => return Err(err.into()),
                    AssignmentPolicy::Lenient => {
                        self.skipped += 1;
                        tracing::debug!(
                            entity = err.entity,
                            field = err.field,
                            column = %err.column,
                            error = %err.source,
                            "skipped field assignment"
                        );
                    }
                }
            }
        }
        Ok(Some(entity))
    }

    /// Advance once and materialize that row.
    pub fn materialize_first<T, C>(
        &mut self,
        cursor: &mut C,
        descriptor: &SchemaDescriptor,
    ) -> Result<Option<T>, DataError>
    where
        T: Entity,
        C: Cursor + ?Sized,
    {
        cursor.advance();
        self.materialize_one(&*cursor, descriptor)
    }

    /// Drain the cursor into a buffered vector, in cursor order.
    pub fn materialize_many<T, C>(
        &mut self,
        cursor: &mut C,
        descriptor: &SchemaDescriptor,
    ) -> Result<Vec<T>, DataError>
    where
        T: Entity,
        C: Cursor + ?Sized,
    {
        let mut entities = Vec::new();
        while cursor.advance() {
            if let Some(entity) = self.materialize_one(&*cursor, descriptor)? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }
}
