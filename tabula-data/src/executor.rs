//! The command executor boundary: parameters, cursors and the executor trait
//! itself. Everything that actually talks to a database lives behind
//! [`CommandExecutor`].

use std::collections::VecDeque;
use std::future::Future;
use std::ops::{Deref, DerefMut};

use crate::error::DataError;
use crate::value::Value;

/// Marker prefixed to parameter names inside generated SQL (`@Id`, `@0`).
pub const PARAM_MARKER: char = '@';

/// Declared type of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    Int32,
    String,
    DateTime,
    Boolean,
    Double,
    Decimal,
    Object,
}

impl DbType {
    /// Narrowest declared type for a value. Single-precision floats map to
    /// `Decimal`; anything else without a dedicated type is `Object`.
    pub fn infer(value: &Value) -> DbType {
        match value {
            Value::Int32(_) => DbType::Int32,
            Value::Text(_) => DbType::String,
            Value::Timestamp(_) => DbType::DateTime,
            Value::Bool(_) => DbType::Boolean,
            Value::Double(_) => DbType::Double,
            Value::Float(_) => DbType::Decimal,
            Value::Null | Value::Int64(_) | Value::Bytes(_) => DbType::Object,
        }
    }
}

/// A named, typed value bound to a statement.
///
/// Names are stored without the [`PARAM_MARKER`]; `Parameter::new("Id", ..)`
/// binds the `@Id` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub db_type: DbType,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, db_type: DbType, value: impl Into<Value>) -> Self {
        let name = name.into();
        let name = match name.strip_prefix(PARAM_MARKER) {
            Some(stripped) => stripped.to_string(),
            None => name,
        };
        Self {
            name,
            db_type,
            value: value.into(),
        }
    }

    /// Create a parameter whose type is inferred from its value.
    pub fn inferred(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        let db_type = DbType::infer(&value);
        Self::new(name, db_type, value)
    }

    /// Name positional values `0`, `1`, ... in argument order.
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Vec<Parameter> {
        values
            .into_iter()
            .enumerate()
            .map(|(idx, value)| Parameter::inferred(idx.to_string(), value))
            .collect()
    }

    /// The placeholder as it appears in SQL text.
    pub fn placeholder(&self) -> String {
        format!("{PARAM_MARKER}{}", self.name)
    }
}

/// Forward-only handle over a tabular result.
///
/// A fresh cursor is positioned before the first row; call [`advance`]
/// to move onto it.
///
/// [`advance`]: Cursor::advance
pub trait Cursor {
    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> bool;

    /// Whether the cursor currently sits on a row.
    fn has_row(&self) -> bool;

    /// Position of a column in the result, or `None` if it is not there.
    fn ordinal(&self, column: &str) -> Option<usize>;

    /// Value at `ordinal` in the current row.
    fn value(&self, ordinal: usize) -> Option<&Value>;
}

/// Fully buffered result set. Executors that fetch eagerly return this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: VecDeque::new(),
            current: None,
        }
    }

    /// Builder-style row append, handy for tests and fixtures.
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.push_row(row);
        self
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push_back(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows not yet consumed by [`Cursor::advance`].
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for RowSet {
    fn advance(&mut self) -> bool {
        self.current = self.rows.pop_front();
        self.current.is_some()
    }

    fn has_row(&self) -> bool {
        self.current.is_some()
    }

    fn ordinal(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(column)))
    }

    fn value(&self, ordinal: usize) -> Option<&Value> {
        self.current.as_ref().and_then(|row| row.get(ordinal))
    }
}

/// The collaborator that actually runs SQL.
///
/// An executor owns at most one live connection at a time. All methods take
/// `&mut self`, so one executor serves one caller at a time; give each worker
/// its own executor instead of sharing one.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
pub trait CommandExecutor: Send {
    type Cursor: Cursor + Send;

    /// Acquire the underlying connection. Must be a no-op when already open.
    fn open(&mut self) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Release the underlying connection. Must be a no-op when already closed.
    fn close(&mut self);

    fn execute_query(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<Self::Cursor, DataError>> + Send;

    /// Run a read statement with parameters. The parameters are consumed by
    /// the call whatever its outcome.
    fn execute_with_parameters(
        &mut self,
        sql: &str,
        params: Vec<Parameter>,
    ) -> impl Future<Output = Result<Self::Cursor, DataError>> + Send;

    /// Run an insert/update/delete and return the affected row count.
    fn execute_non_query(
        &mut self,
        sql: &str,
        params: Vec<Parameter>,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;
}

/// Scoped use of an executor: opened on creation, closed on drop.
///
/// Dropping happens on every exit path, including `?` early returns and a
/// cancelled future, so the connection is always handed back.
pub struct Session<'a, E: CommandExecutor> {
    executor: &'a mut E,
}

impl<'a, E: CommandExecutor> Session<'a, E> {
    pub async fn open(executor: &'a mut E) -> Result<Self, DataError> {
        // Guard first so a half-open connection is still closed if `open` fails.
        let session = Session { executor };
        session.executor.open().await?;
        Ok(session)
    }
}

impl<E: CommandExecutor> Deref for Session<'_, E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        self.executor
    }
}

impl<E: CommandExecutor> DerefMut for Session<'_, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.executor
    }
}

impl<E: CommandExecutor> Drop for Session<'_, E> {
    fn drop(&mut self) {
        self.executor.close();
    }
}
