//! SQL text synthesis from resolved entity metadata.
//!
//! # Invariants
//! - Output depends only on the `EntityDescriptor`; no I/O.
//! - Values are never interpolated: every value slot is a `:name` placeholder.
//! - Placeholders are named after fields, which are unique per entity; column
//!   names may collide with another field's name.
//! - Identity-generated entities omit the id from INSERT column and value lists.

use crate::meta::EntityDescriptor;

/// `SELECT * FROM {table}`
pub fn select_all(descriptor: &EntityDescriptor) -> String {
    format!("SELECT * FROM {}", descriptor.table_name)
}

/// `SELECT * FROM {table} WHERE {idColumn} = :{idField}`
pub fn select_by_id(descriptor: &EntityDescriptor) -> String {
    format!("{} WHERE {}", select_all(descriptor), id_predicate(descriptor))
}

/// `INSERT INTO {table} ({columns}) VALUES ({placeholders})`
pub fn insert(descriptor: &EntityDescriptor) -> String {
    let mut columns = Vec::with_capacity(descriptor.columns.len());
    let mut placeholders = Vec::with_capacity(descriptor.columns.len());

    if !descriptor.is_id_generated() {
        columns.push(descriptor.id_column.column_name.clone());
        placeholders.push(format!(":{}", descriptor.id_column.field_name));
    }
    for column in descriptor.data_columns() {
        columns.push(column.column_name.clone());
        placeholders.push(format!(":{}", column.field_name));
    }

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        descriptor.table_name,
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// `DELETE FROM {table} WHERE {idColumn} = :{idField}`
pub fn delete(descriptor: &EntityDescriptor) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        descriptor.table_name,
        id_predicate(descriptor)
    )
}

fn id_predicate(descriptor: &EntityDescriptor) -> String {
    format!(
        "{} = :{}",
        descriptor.id_column.column_name, descriptor.id_column.field_name
    )
}
