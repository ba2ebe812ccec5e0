//! Conversion between result rows and entity instances.
//!
//! # Responsibility
//! - Build entity instances from the current row of a `RowSet`.
//! - Extract the persisted field values of an entity as named parameters.
//!
//! # Invariants
//! - Only non-transient fields are read or written.
//! - NULL is preserved in both directions; it is never replaced by a default.
//! - Values that do not fit the declared kind fail instead of becoming NULL.

use crate::db::{DbResult, RowSet};
use crate::error::{OrmError, OrmResult};
use crate::meta::{describe, ColumnDescriptor, EntityDescriptor, ValidationError};
use crate::model::schema::{FieldAccess, TypeDescriptor};
use crate::model::value::{Value, ValueKind};
use std::collections::BTreeMap;

/// Reads `column` of the current row as a value of `kind`.
pub fn read_column(rows: &dyn RowSet, column: &str, kind: ValueKind) -> DbResult<Value> {
    let value = match kind {
        ValueKind::String => rows.get_string(column)?.map(Value::String),
        ValueKind::Integer => rows.get_int(column)?.map(Value::Integer),
        ValueKind::Long => rows.get_long(column)?.map(Value::Long),
        ValueKind::Double => rows.get_double(column)?.map(Value::Double),
        ValueKind::Boolean => rows.get_bool(column)?.map(Value::Boolean),
        ValueKind::Date => rows.get_date(column)?.map(Value::Date),
    };
    Ok(value.unwrap_or(Value::Null))
}

struct MappedColumn<T> {
    column: ColumnDescriptor,
    access: FieldAccess<T>,
}

/// Validated mapping of one entity type.
pub struct EntityMapping<T> {
    schema: TypeDescriptor<T>,
    descriptor: EntityDescriptor,
    columns: Vec<MappedColumn<T>>,
    id_access: FieldAccess<T>,
}

impl<T> EntityMapping<T> {
    /// Resolves `schema` and captures the access path of every column.
    pub fn new(schema: TypeDescriptor<T>) -> Result<Self, ValidationError> {
        let descriptor = describe(&schema)?;
        let columns = descriptor
            .columns
            .iter()
            .filter_map(|column| {
                schema.field_by_name(column.field_name).map(|field| MappedColumn {
                    column: column.clone(),
                    access: field.access().clone(),
                })
            })
            .collect::<Vec<_>>();
        let id_access = columns
            .iter()
            .find(|mapped| mapped.column.field_name == descriptor.id_column.field_name)
            .map(|mapped| mapped.access.clone())
            .ok_or(ValidationError::MissingIdentity {
                entity: descriptor.entity_name,
            })?;

        Ok(Self {
            schema,
            descriptor,
            columns,
            id_access,
        })
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn entity_name(&self) -> &'static str {
        self.descriptor.entity_name
    }

    /// Builds one instance from the current row of `rows`.
    pub fn row_to_entity(&self, rows: &dyn RowSet) -> OrmResult<T> {
        let mut entity = self
            .schema
            .instantiate()
            .ok_or(OrmError::Instantiation(self.entity_name()))?;

        for mapped in &self.columns {
            let value = read_column(rows, &mapped.column.column_name, mapped.column.value_kind)?;
            self.write(&mapped.access, &mapped.column, &mut entity, value)?;
        }
        Ok(entity)
    }

    /// Maps every remaining row of `rows`, in row order.
    pub fn rows_to_entities(&self, rows: &mut dyn RowSet) -> OrmResult<Vec<T>> {
        let mut entities = Vec::new();
        while rows.advance()? {
            entities.push(self.row_to_entity(&*rows)?);
        }
        Ok(entities)
    }

    /// Current value of every persisted field, keyed by field name.
    pub fn entity_to_params(&self, entity: &T) -> BTreeMap<String, Value> {
        self.columns
            .iter()
            .map(|mapped| (mapped.column.field_name.to_string(), mapped.access.read(entity)))
            .collect()
    }

    pub fn id_value(&self, entity: &T) -> Value {
        self.id_access.read(entity)
    }

    pub fn set_id_value(&self, entity: &mut T, value: Value) -> OrmResult<()> {
        self.write(&self.id_access, &self.descriptor.id_column, entity, value)
    }

    fn write(
        &self,
        access: &FieldAccess<T>,
        column: &ColumnDescriptor,
        entity: &mut T,
        value: Value,
    ) -> OrmResult<()> {
        access
            .write(entity, value)
            .map_err(|source| OrmError::Mapping {
                entity: self.entity_name(),
                field: column.field_name,
                source,
            })
    }
}
