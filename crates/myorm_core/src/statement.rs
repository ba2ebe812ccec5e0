//! Named-parameter statements over positional executors.
//!
//! # Responsibility
//! - Tokenize SQL templates and collect `:name` placeholders.
//! - Rewrite templates into positional `?` SQL for the executor.
//! - Bind values by name, dispatching on the value variant.
//!
//! # Invariants
//! - Every placeholder occurrence gets its own 1-based position, in
//!   left-to-right order; occurrences sharing a name share the bound value.
//! - `parse_template` and `to_positional_sql` agree on what a placeholder is.
//! - Text inside `'...'` literals, `"..."` identifiers, `--` line comments
//!   and `/* */` block comments never contains placeholders and is passed
//!   through unchanged.
//! - Values reach the executor only through typed setters, never as SQL text.

use crate::db::{DbError, DbResult, Executor, GeneratedKeys, PreparedStatement, RowSet};
use crate::model::value::Value;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::Range;

const PLACEHOLDER_SIGIL: char = ':';

// Tokens are maximal runs outside the delimiter set (space, comma, `=`, `.`,
// parentheses, plus other whitespace and `;`).
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\s,=.();]+").expect("valid sql token regex"));

/// One placeholder occurrence in a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedParameter {
    pub name: String,
    pub position: usize,
}

impl NamedParameter {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Failure to bind one named parameter.
#[derive(Debug)]
pub struct BindingError {
    pub name: String,
    /// Display form of the offending value.
    pub value: String,
    pub source: DbError,
}

impl Display for BindingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to bind parameter `{}` with value `{}`: {}",
            self.name, self.value, self.source
        )
    }
}

impl Error for BindingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

struct Placeholder<'s> {
    name: &'s str,
    start: usize,
    end: usize,
}

// Byte ranges of quoted text and comments, start to closing delimiter.
// An unterminated region runs to the end of the template.
fn opaque_regions(sql: &str) -> Vec<Range<usize>> {
    let bytes = sql.as_bytes();
    let mut regions = Vec::new();
    let mut index = 0;
    while index < bytes.len() {
        let start = index;
        let end = match (bytes[index], bytes.get(index + 1)) {
            (quote @ (b'\'' | b'"'), _) => bytes[index + 1..]
                .iter()
                .position(|byte| *byte == quote)
                .map_or(bytes.len(), |offset| index + 1 + offset + 1),
            (b'-', Some(b'-')) => bytes[index..]
                .iter()
                .position(|byte| *byte == b'\n')
                .map_or(bytes.len(), |offset| index + offset),
            (b'/', Some(b'*')) => sql[index + 2..]
                .find("*/")
                .map_or(bytes.len(), |offset| index + 2 + offset + 2),
            _ => {
                index += 1;
                continue;
            }
        };
        regions.push(start..end);
        index = end;
    }
    regions
}

fn placeholders(sql: &str) -> impl Iterator<Item = Placeholder<'_>> {
    let opaque = opaque_regions(sql);
    TOKEN_RE.find_iter(sql).filter_map(move |token| {
        let name = token.as_str().strip_prefix(PLACEHOLDER_SIGIL)?;
        if name.is_empty() || opaque.iter().any(|region| region.contains(&token.start())) {
            return None;
        }
        Some(Placeholder {
            name,
            start: token.start(),
            end: token.end(),
        })
    })
}

/// Collects every placeholder occurrence of `sql` in order.
///
/// `parse_template("SELECT * FROM t WHERE c = :x")` yields `[("x", 1)]`.
pub fn parse_template(sql: &str) -> Vec<NamedParameter> {
    placeholders(sql)
        .enumerate()
        .map(|(index, placeholder)| NamedParameter::new(placeholder.name, index + 1))
        .collect()
}

/// Replaces every placeholder occurrence of `sql` with `?`.
pub fn to_positional_sql(sql: &str) -> String {
    let mut rewritten = String::with_capacity(sql.len());
    let mut cursor = 0;
    for placeholder in placeholders(sql) {
        rewritten.push_str(&sql[cursor..placeholder.start]);
        rewritten.push('?');
        cursor = placeholder.end;
    }
    rewritten.push_str(&sql[cursor..]);
    rewritten
}

/// A prepared statement addressed by parameter name.
///
/// Owns the executor statement for one logical execution; dropping it
/// releases the statement.
pub struct BoundStatement<'e> {
    statement: Box<dyn PreparedStatement + 'e>,
    parameters: Vec<NamedParameter>,
}

impl<'e> BoundStatement<'e> {
    /// Parses `sql`, rewrites it to positional form and prepares it.
    pub fn prepare<E: Executor + ?Sized>(
        executor: &'e E,
        sql: &str,
        keys: GeneratedKeys,
    ) -> DbResult<Self> {
        let parameters = parse_template(sql);
        let positional = to_positional_sql(sql);
        debug!(
            "event=statement_prepare module=statement status=start parameters={} sql={positional}",
            parameters.len()
        );
        let statement = executor.prepare(&positional, keys)?;
        Ok(Self {
            statement,
            parameters,
        })
    }

    pub fn parameters(&self) -> &[NamedParameter] {
        &self.parameters
    }

    /// Binds `value` to every position of `name`.
    ///
    /// A name that does not occur in the template is ignored.
    pub fn bind(&mut self, name: &str, value: &Value) -> Result<(), BindingError> {
        let positions: Vec<usize> = self
            .parameters
            .iter()
            .filter(|parameter| parameter.name == name)
            .map(|parameter| parameter.position)
            .collect();

        if positions.is_empty() {
            debug!("event=statement_bind module=statement status=skipped name={name}");
            return Ok(());
        }

        for position in positions {
            set_value(self.statement.as_mut(), position, value).map_err(|source| BindingError {
                name: name.to_string(),
                value: value.to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Binds every entry of `values`.
    pub fn bind_all(&mut self, values: &BTreeMap<String, Value>) -> Result<(), BindingError> {
        for (name, value) in values {
            self.bind(name, value)?;
        }
        Ok(())
    }

    pub fn execute(&mut self) -> DbResult<bool> {
        self.statement.execute()
    }

    pub fn execute_query(&mut self) -> DbResult<Box<dyn RowSet>> {
        self.statement.execute_query()
    }

    pub fn execute_update(&mut self) -> DbResult<usize> {
        self.statement.execute_update()
    }

    pub fn generated_keys(&mut self) -> DbResult<Box<dyn RowSet>> {
        self.statement.generated_keys()
    }
}

fn set_value(
    statement: &mut (dyn PreparedStatement + '_),
    position: usize,
    value: &Value,
) -> DbResult<()> {
    match value {
        Value::Null => statement.set_null(position),
        Value::String(value) => statement.set_string(position, value),
        Value::Integer(value) => statement.set_int(position, *value),
        Value::Long(value) => statement.set_long(position, *value),
        Value::Double(value) => statement.set_double(position, *value),
        Value::Boolean(value) => statement.set_bool(position, *value),
        Value::Date(value) => statement.set_date(position, *value),
    }
}
