//! Entity manager over a fixed, validated registration set.
//!
//! # Responsibility
//! - Validate every registered entity type once, at construction.
//! - Implement find/find_all/save/delete by composing SQL generation,
//!   named-parameter binding and row mapping.
//!
//! # Invariants
//! - A manager is either fully validated or never constructed.
//! - The registration set is immutable for the manager lifetime.
//! - Each operation prepares exactly one statement and drops it before
//!   returning, on success and failure alike.

use crate::db::{Executor, GeneratedKeys};
use crate::error::{OrmError, OrmResult};
use crate::mapper::{read_column, EntityMapping};
use crate::meta::ValidationError;
use crate::model::schema::{Entity, TypeDescriptor};
use crate::model::value::Value;
use crate::sql;
use crate::statement::BoundStatement;
use log::{debug, error, info};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

type ErasedMapping = Box<dyn Any + Send + Sync>;

trait Registration: Send + Sync {
    fn entity_type_id(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
    fn resolve(self: Box<Self>) -> Result<ErasedMapping, ValidationError>;
}

struct PendingEntity<T>(TypeDescriptor<T>);

impl<T: 'static> Registration for PendingEntity<T> {
    fn entity_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    fn resolve(self: Box<Self>) -> Result<ErasedMapping, ValidationError> {
        let mapping = EntityMapping::new(self.0)?;
        Ok(Box::new(mapping))
    }
}

/// Entity types handed to `EntityManager::new`.
#[derive(Default)]
pub struct EntitySet {
    entries: Vec<Box<dyn Registration>>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type using its own descriptor.
    pub fn with<T: Entity>(self) -> Self {
        self.register(T::descriptor())
    }

    /// Adds a type using an explicit descriptor.
    pub fn register<T: 'static>(mut self, descriptor: TypeDescriptor<T>) -> Self {
        self.entries.push(Box::new(PendingEntity(descriptor)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps registered entity types onto an injected executor.
pub struct EntityManager<E: Executor> {
    executor: E,
    mappings: HashMap<TypeId, ErasedMapping>,
}

impl<E: Executor> EntityManager<E> {
    /// Validates every entry of `entities` and builds the manager.
    ///
    /// # Errors
    /// - `OrmError::Validation` for the first entry that is not a mappable
    ///   entity, or when a type is registered twice.
    pub fn new(executor: E, entities: EntitySet) -> OrmResult<Self> {
        let started_at = Instant::now();
        let count = entities.len();
        let mut mappings = HashMap::with_capacity(count);

        for entry in entities.entries {
            let type_id = entry.entity_type_id();
            let type_name = entry.type_name();
            if mappings.contains_key(&type_id) {
                let err = ValidationError::DuplicateRegistration { entity: type_name };
                error!(
                    "event=manager_init module=manager status=error entity={type_name} error={err}"
                );
                return Err(err.into());
            }
            match entry.resolve() {
                Ok(mapping) => {
                    mappings.insert(type_id, mapping);
                }
                Err(err) => {
                    error!(
                        "event=manager_init module=manager status=error entity={type_name} error={err}"
                    );
                    return Err(err.into());
                }
            }
        }

        info!(
            "event=manager_init module=manager status=ok entities={count} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(Self { executor, mappings })
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn is_managed<T: 'static>(&self) -> bool {
        self.mappings.contains_key(&TypeId::of::<T>())
    }

    fn mapping<T: 'static>(&self) -> OrmResult<&EntityMapping<T>> {
        self.mappings
            .get(&TypeId::of::<T>())
            .and_then(|mapping| mapping.downcast_ref::<EntityMapping<T>>())
            .ok_or(OrmError::UnmanagedType(std::any::type_name::<T>()))
    }

    /// Loads one entity by identity. A missing row is `Ok(None)`.
    pub fn find<T: 'static>(&self, id: impl Into<Value>) -> OrmResult<Option<T>> {
        let mapping = self.mapping::<T>()?;
        let started_at = Instant::now();
        let result = self.find_with(mapping, id.into());
        log_outcome("entity_find", mapping.entity_name(), started_at, &result);
        result
    }

    fn find_with<T>(&self, mapping: &EntityMapping<T>, id: Value) -> OrmResult<Option<T>> {
        let descriptor = mapping.descriptor();
        let mut stmt = BoundStatement::prepare(
            &self.executor,
            &sql::select_by_id(descriptor),
            GeneratedKeys::None,
        )?;
        stmt.bind(descriptor.id_column.field_name, &id)?;

        let mut rows = stmt.execute_query()?;
        if rows.advance()? {
            return Ok(Some(mapping.row_to_entity(&*rows)?));
        }
        Ok(None)
    }

    /// Loads every row of the entity table, in the order the database returns.
    pub fn find_all<T: 'static>(&self) -> OrmResult<Vec<T>> {
        let mapping = self.mapping::<T>()?;
        let started_at = Instant::now();
        let result = self.find_all_with(mapping);
        log_outcome("entity_find_all", mapping.entity_name(), started_at, &result);
        result
    }

    fn find_all_with<T>(&self, mapping: &EntityMapping<T>) -> OrmResult<Vec<T>> {
        let mut stmt = BoundStatement::prepare(
            &self.executor,
            &sql::select_all(mapping.descriptor()),
            GeneratedKeys::None,
        )?;
        let mut rows = stmt.execute_query()?;
        mapping.rows_to_entities(&mut *rows)
    }

    /// Inserts `entity` and returns it, with the generated identity written
    /// back when the database assigns it.
    ///
    /// # Errors
    /// - `OrmError::MissingGeneratedKey` when an identity insert reports no key.
    /// - `OrmError::Persistence` or `OrmError::Mapping` when the generated key
    ///   does not fit the id field (e.g. a rowid past `i32::MAX`). The row
    ///   stays inserted; no transaction is opened here to undo it.
    pub fn save<T: 'static>(&self, entity: T) -> OrmResult<T> {
        let mapping = self.mapping::<T>()?;
        let started_at = Instant::now();
        let result = self.save_with(mapping, entity);
        log_outcome("entity_save", mapping.entity_name(), started_at, &result);
        result
    }

    fn save_with<T>(&self, mapping: &EntityMapping<T>, mut entity: T) -> OrmResult<T> {
        let descriptor = mapping.descriptor();
        let generated = descriptor.is_id_generated();
        let keys = if generated {
            GeneratedKeys::Return
        } else {
            GeneratedKeys::None
        };

        let mut stmt = BoundStatement::prepare(&self.executor, &sql::insert(descriptor), keys)?;
        stmt.bind_all(&mapping.entity_to_params(&entity))?;
        stmt.execute_update()?;

        if generated {
            let mut keys = stmt.generated_keys()?;
            let missing = || OrmError::MissingGeneratedKey(mapping.entity_name());
            if !keys.advance()? {
                return Err(missing());
            }
            let column = keys.column_names().first().cloned().ok_or_else(missing)?;
            let key = read_column(&*keys, &column, descriptor.id_column.value_kind)?;
            if key.is_null() {
                return Err(missing());
            }
            mapping.set_id_value(&mut entity, key)?;
        }
        Ok(entity)
    }

    /// Deletes the row matching the current identity of `entity`.
    ///
    /// Returns `false` when no row matched.
    pub fn delete<T: 'static>(&self, entity: &T) -> OrmResult<bool> {
        let mapping = self.mapping::<T>()?;
        let started_at = Instant::now();
        let result = self.delete_with(mapping, entity);
        log_outcome("entity_delete", mapping.entity_name(), started_at, &result);
        result
    }

    fn delete_with<T>(&self, mapping: &EntityMapping<T>, entity: &T) -> OrmResult<bool> {
        let descriptor = mapping.descriptor();
        let mut stmt = BoundStatement::prepare(
            &self.executor,
            &sql::delete(descriptor),
            GeneratedKeys::None,
        )?;
        stmt.bind(descriptor.id_column.field_name, &mapping.id_value(entity))?;
        Ok(stmt.execute_update()? > 0)
    }
}

fn log_outcome<R>(event: &str, entity: &str, started_at: Instant, result: &OrmResult<R>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => debug!(
            "event={event} module=manager status=ok entity={entity} duration_ms={duration_ms}"
        ),
        Err(err) => error!(
            "event={event} module=manager status=error entity={entity} duration_ms={duration_ms} error={err}"
        ),
    }
}
