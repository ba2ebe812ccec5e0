//! Registration-time description of entity types.
//!
//! # Responsibility
//! - Describe how one Rust type maps onto a table: entity marker, table
//!   override, per-field column override, transient flag and identity policy.
//! - Carry the typed accessors used to read and write field values.
//!
//! # Invariants
//! - Descriptors are plain data; validation happens in `meta::describe`.
//! - Every field has at least one access path (accessor or direct).

use crate::model::value::{ColumnValue, Value, ValueError, ValueKind};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Primary key generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationType {
    /// The application assigns identity values.
    #[default]
    None,
    /// The database assigns identity values on insert.
    Identity,
}

type ReadFn<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type WriteFn<T> = Arc<dyn Fn(&mut T, Value) -> Result<(), ValueError> + Send + Sync>;

/// One way to reach a field value.
pub struct FieldAccess<T> {
    read: ReadFn<T>,
    write: WriteFn<T>,
}

impl<T> FieldAccess<T> {
    pub fn read(&self, entity: &T) -> Value {
        (self.read)(entity)
    }

    pub fn write(&self, entity: &mut T, value: Value) -> Result<(), ValueError> {
        (self.write)(entity, value)
    }
}

impl<T> Clone for FieldAccess<T> {
    fn clone(&self) -> Self {
        Self {
            read: Arc::clone(&self.read),
            write: Arc::clone(&self.write),
        }
    }
}

/// Persistence description of one declared field.
pub struct FieldDescriptor<T> {
    name: &'static str,
    kind: ValueKind,
    column: Option<String>,
    transient: bool,
    identity: Option<GenerationType>,
    base: FieldAccess<T>,
    accessor: Option<FieldAccess<T>>,
}

impl<T: 'static> FieldDescriptor<T> {
    /// Field reached by direct borrow of the struct member.
    pub fn direct<V>(name: &'static str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self
    where
        V: ColumnValue + Clone + 'static,
    {
        Self::bare(name, V::KIND, direct_access(get, get_mut))
    }

    /// Field reached through getter/setter methods.
    pub fn accessors<V>(name: &'static str, getter: fn(&T) -> V, setter: fn(&mut T, V)) -> Self
    where
        V: ColumnValue + 'static,
    {
        Self::bare(name, V::KIND, accessor_access(getter, setter))
    }

    /// Adds getter/setter methods to a direct field; the mapper prefers them.
    pub fn with_accessors<V>(mut self, getter: fn(&T) -> V, setter: fn(&mut T, V)) -> Self
    where
        V: ColumnValue + 'static,
    {
        self.accessor = Some(accessor_access(getter, setter));
        self
    }

    fn bare(name: &'static str, kind: ValueKind, base: FieldAccess<T>) -> Self {
        Self {
            name,
            kind,
            column: None,
            transient: false,
            identity: None,
            base,
            accessor: None,
        }
    }
}

impl<T> FieldDescriptor<T> {
    /// Overrides the column name. Empty overrides fall back to the field name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Excludes the field from persistence.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Marks the field as the entity identity.
    pub fn id(mut self, generation: GenerationType) -> Self {
        self.identity = Some(generation);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn column_override(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn identity(&self) -> Option<GenerationType> {
        self.identity
    }

    /// Preferred access path: accessor methods first, direct access second.
    pub fn access(&self) -> &FieldAccess<T> {
        self.accessor.as_ref().unwrap_or(&self.base)
    }
}

impl<T> Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("column", &self.column)
            .field("transient", &self.transient)
            .field("identity", &self.identity)
            .field("accessor", &self.accessor.is_some())
            .finish()
    }
}

fn direct_access<T, V>(get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> FieldAccess<T>
where
    T: 'static,
    V: ColumnValue + Clone + 'static,
{
    FieldAccess {
        read: Arc::new(move |entity: &T| get(entity).clone().into_value()),
        write: Arc::new(move |entity: &mut T, value: Value| {
            *get_mut(entity) = V::from_value(value)?;
            Ok(())
        }),
    }
}

fn accessor_access<T, V>(getter: fn(&T) -> V, setter: fn(&mut T, V)) -> FieldAccess<T>
where
    T: 'static,
    V: ColumnValue + 'static,
{
    FieldAccess {
        read: Arc::new(move |entity: &T| getter(entity).into_value()),
        write: Arc::new(move |entity: &mut T, value: Value| {
            setter(entity, V::from_value(value)?);
            Ok(())
        }),
    }
}

/// Registration input for one Rust type.
pub struct TypeDescriptor<T> {
    type_name: &'static str,
    entity: bool,
    table: Option<String>,
    fields: Vec<FieldDescriptor<T>>,
    constructor: Option<fn() -> T>,
}

impl<T> TypeDescriptor<T> {
    /// Starts a descriptor for a type named `type_name` without entity marker.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            entity: false,
            table: None,
            fields: Vec::new(),
            constructor: None,
        }
    }

    /// Sets the entity marker.
    pub fn entity(mut self) -> Self {
        self.entity = true;
        self
    }

    /// Sets the entity marker with a table override.
    pub fn entity_table(mut self, table: impl Into<String>) -> Self {
        self.entity = true;
        self.table = Some(table.into());
        self
    }

    /// Registers the default constructor used when mapping rows.
    pub fn constructor(mut self, constructor: fn() -> T) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Appends one field; declaration order is preserved.
    pub fn field(mut self, field: FieldDescriptor<T>) -> Self {
        self.fields.push(field);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn has_entity_marker(&self) -> bool {
        self.entity
    }

    pub fn table_override(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn instantiate(&self) -> Option<T> {
        self.constructor.map(|constructor| constructor())
    }
}

impl<T: Default> TypeDescriptor<T> {
    /// Shorthand for `new(type_name).constructor(T::default)`.
    pub fn with_default(type_name: &'static str) -> Self {
        Self::new(type_name).constructor(T::default)
    }
}

impl<T> Debug for TypeDescriptor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("entity", &self.entity)
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Types that know their own registration descriptor.
pub trait Entity: Sized + 'static {
    fn descriptor() -> TypeDescriptor<Self>;
}
