//! Metadata resolution from registered type descriptors.
//!
//! # Responsibility
//! - Resolve table and column names, the identity column and the persisted
//!   column list of one `TypeDescriptor`.
//! - Reject descriptors that cannot be mapped.
//!
//! # Invariants
//! - Resolution is pure: the same descriptor always yields the same result.
//! - `columns` preserves declaration order and never contains transient fields.
//! - An `EntityDescriptor` always has exactly one identity column.

use crate::model::schema::{FieldDescriptor, GenerationType, TypeDescriptor};
use crate::model::value::ValueKind;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Resolved mapping of one persisted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub field_name: &'static str,
    pub column_name: String,
    pub value_kind: ValueKind,
}

/// Resolved mapping of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub entity_name: &'static str,
    pub table_name: String,
    /// All persisted columns in declaration order, identity included.
    pub columns: Vec<ColumnDescriptor>,
    pub id_column: ColumnDescriptor,
    pub id_generation: GenerationType,
}

impl EntityDescriptor {
    /// Columns other than the identity, in declaration order.
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(move |column| column.field_name != self.id_column.field_name)
    }

    pub fn is_id_generated(&self) -> bool {
        self.id_generation == GenerationType::Identity
    }
}

/// Registration errors. Fatal at manager construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingEntityMarker {
        entity: &'static str,
    },
    MissingIdentity {
        entity: &'static str,
    },
    MultipleIdentity {
        entity: &'static str,
        fields: Vec<&'static str>,
    },
    TransientIdentity {
        entity: &'static str,
        field: &'static str,
    },
    NonIntegralGeneratedIdentity {
        entity: &'static str,
        field: &'static str,
        kind: ValueKind,
    },
    DuplicateField {
        entity: &'static str,
        field: &'static str,
    },
    DuplicateColumn {
        entity: &'static str,
        column: String,
    },
    DuplicateRegistration {
        entity: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEntityMarker { entity } => {
                write!(f, "type `{entity}` is not marked as an entity")
            }
            Self::MissingIdentity { entity } => {
                write!(f, "entity `{entity}` declares no identity field")
            }
            Self::MultipleIdentity { entity, fields } => write!(
                f,
                "entity `{entity}` declares more than one identity field: {}",
                fields.join(", ")
            ),
            Self::TransientIdentity { entity, field } => {
                write!(f, "identity field `{entity}.{field}` cannot be transient")
            }
            Self::NonIntegralGeneratedIdentity {
                entity,
                field,
                kind,
            } => write!(
                f,
                "generated identity field `{entity}.{field}` must be integer or long, found {kind}"
            ),
            Self::DuplicateField { entity, field } => {
                write!(f, "entity `{entity}` declares field `{field}` twice")
            }
            Self::DuplicateColumn { entity, column } => {
                write!(f, "entity `{entity}` maps column `{column}` twice")
            }
            Self::DuplicateRegistration { entity } => {
                write!(f, "entity `{entity}` is registered twice")
            }
        }
    }
}

impl Error for ValidationError {}

/// Table override when present and non-empty, else the bare type name.
pub fn resolve_table<T>(descriptor: &TypeDescriptor<T>) -> String {
    non_empty(descriptor.table_override()).unwrap_or_else(|| descriptor.type_name().to_string())
}

/// Column override when present and non-empty, else the field name.
pub fn resolve_column<T>(field: &FieldDescriptor<T>) -> String {
    non_empty(field.column_override()).unwrap_or_else(|| field.name().to_string())
}

/// The single identity-marked field of `descriptor`.
pub fn resolve_identity<T>(
    descriptor: &TypeDescriptor<T>,
) -> Result<(ColumnDescriptor, GenerationType), ValidationError> {
    let entity = descriptor.type_name();
    let marked: Vec<&FieldDescriptor<T>> = descriptor
        .fields()
        .iter()
        .filter(|field| field.identity().is_some())
        .collect();

    match marked.as_slice() {
        [] => Err(ValidationError::MissingIdentity { entity }),
        [field] => {
            let generation = field.identity().unwrap_or_default();
            Ok((column_descriptor(field), generation))
        }
        many => Err(ValidationError::MultipleIdentity {
            entity,
            fields: many.iter().map(|field| field.name()).collect(),
        }),
    }
}

/// Every non-transient field in declaration order.
pub fn resolve_columns<T>(descriptor: &TypeDescriptor<T>) -> Vec<ColumnDescriptor> {
    descriptor
        .fields()
        .iter()
        .filter(|field| !field.is_transient())
        .map(column_descriptor)
        .collect()
}

/// Fully resolves and validates `descriptor`.
pub fn describe<T>(descriptor: &TypeDescriptor<T>) -> Result<EntityDescriptor, ValidationError> {
    let entity = descriptor.type_name();
    if !descriptor.has_entity_marker() {
        return Err(ValidationError::MissingEntityMarker { entity });
    }

    let mut field_names = BTreeSet::new();
    for field in descriptor.fields() {
        if !field_names.insert(field.name()) {
            return Err(ValidationError::DuplicateField {
                entity,
                field: field.name(),
            });
        }
    }

    let (id_column, id_generation) = resolve_identity(descriptor)?;
    let id_field = descriptor
        .field_by_name(id_column.field_name)
        .filter(|field| !field.is_transient());
    if id_field.is_none() {
        return Err(ValidationError::TransientIdentity {
            entity,
            field: id_column.field_name,
        });
    }
    if id_generation == GenerationType::Identity && !id_column.value_kind.is_integral() {
        return Err(ValidationError::NonIntegralGeneratedIdentity {
            entity,
            field: id_column.field_name,
            kind: id_column.value_kind,
        });
    }

    let columns = resolve_columns(descriptor);
    let mut column_names = BTreeSet::new();
    for column in &columns {
        if !column_names.insert(column.column_name.to_ascii_lowercase()) {
            return Err(ValidationError::DuplicateColumn {
                entity,
                column: column.column_name.clone(),
            });
        }
    }

    Ok(EntityDescriptor {
        entity_name: entity,
        table_name: resolve_table(descriptor),
        columns,
        id_column,
        id_generation,
    })
}

fn column_descriptor<T>(field: &FieldDescriptor<T>) -> ColumnDescriptor {
    ColumnDescriptor {
        field_name: field.name(),
        column_name: resolve_column(field),
        value_kind: field.kind(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{describe, resolve_columns, resolve_identity, resolve_table, ValidationError};
    use crate::model::schema::{FieldDescriptor, GenerationType, TypeDescriptor};
    use crate::model::value::ValueKind;

    #[derive(Debug, Default)]
    struct Account {
        id: i64,
        owner: String,
        nickname: Option<String>,
        cache: i32,
    }

    fn account() -> TypeDescriptor<Account> {
        TypeDescriptor::with_default("Account")
            .entity()
            .field(
                FieldDescriptor::direct("id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
                    .id(GenerationType::Identity),
            )
            .field(
                FieldDescriptor::direct("owner", |a: &Account| &a.owner, |a: &mut Account| {
                    &mut a.owner
                })
                .column("owner_name"),
            )
            .field(
                FieldDescriptor::direct(
                    "nickname",
                    |a: &Account| &a.nickname,
                    |a: &mut Account| &mut a.nickname,
                )
                .column(""),
            )
            .field(
                FieldDescriptor::direct("cache", |a: &Account| &a.cache, |a: &mut Account| {
                    &mut a.cache
                })
                .transient(),
            )
    }

    #[test]
    fn table_name_defaults_to_type_name_and_honors_override() {
        assert_eq!(resolve_table(&account()), "Account");
        assert_eq!(resolve_table(&account().entity_table("accounts")), "accounts");
        assert_eq!(resolve_table(&account().entity_table("  ")), "Account");
    }

    #[test]
    fn columns_skip_transient_fields_and_keep_order() {
        let columns = resolve_columns(&account());
        let names: Vec<&str> = columns.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(names, vec!["id", "owner_name", "nickname"]);
        assert_eq!(columns, resolve_columns(&account()));
    }

    #[test]
    fn describe_resolves_identity_and_generation() {
        let descriptor = describe(&account()).unwrap();
        assert_eq!(descriptor.table_name, "Account");
        assert_eq!(descriptor.id_column.field_name, "id");
        assert_eq!(descriptor.id_column.value_kind, ValueKind::Long);
        assert!(descriptor.is_id_generated());
        let data: Vec<&str> = descriptor.data_columns().map(|c| c.field_name).collect();
        assert_eq!(data, vec!["owner", "nickname"]);
    }

    #[test]
    fn identity_must_be_unique() {
        let none = TypeDescriptor::<Account>::new("NoId").entity().field(
            FieldDescriptor::direct("owner", |a: &Account| &a.owner, |a: &mut Account| {
                &mut a.owner
            }),
        );
        assert_eq!(
            resolve_identity(&none).unwrap_err(),
            ValidationError::MissingIdentity { entity: "NoId" }
        );

        let two = account().field(
            FieldDescriptor::direct("mirror", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
                .id(GenerationType::None),
        );
        assert_eq!(
            describe(&two).unwrap_err(),
            ValidationError::MultipleIdentity {
                entity: "Account",
                fields: vec!["id", "mirror"],
            }
        );
    }

    #[test]
    fn describe_rejects_unmappable_descriptors() {
        let unmarked = TypeDescriptor::<Account>::new("Plain");
        assert_eq!(
            describe(&unmarked).unwrap_err(),
            ValidationError::MissingEntityMarker { entity: "Plain" }
        );

        let transient_id = TypeDescriptor::<Account>::new("T").entity().field(
            FieldDescriptor::direct("id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
                .id(GenerationType::None)
                .transient(),
        );
        assert!(matches!(
            describe(&transient_id),
            Err(ValidationError::TransientIdentity { field: "id", .. })
        ));

        let text_generated = TypeDescriptor::<Account>::new("G").entity().field(
            FieldDescriptor::direct("owner", |a: &Account| &a.owner, |a: &mut Account| {
                &mut a.owner
            })
            .id(GenerationType::Identity),
        );
        assert!(matches!(
            describe(&text_generated),
            Err(ValidationError::NonIntegralGeneratedIdentity {
                kind: ValueKind::String,
                ..
            })
        ));

        let clash = account().field(
            FieldDescriptor::direct("alias", |a: &Account| &a.owner, |a: &mut Account| {
                &mut a.owner
            })
            .column("OWNER_NAME"),
        );
        assert!(matches!(
            describe(&clash),
            Err(ValidationError::DuplicateColumn { .. })
        ));
    }
}
