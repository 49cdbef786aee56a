use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use tabula_data::{CommandExecutor, DataError, Parameter, RowSet, Value};

use crate::error::{SqlxErrorExt, SqlxResult, UnboundParameter};
use crate::rewrite::rewrite_named;

/// [`CommandExecutor`] backed by a SQLx SQLite pool.
///
/// `open` checks a connection out of the pool and `close` hands it back.
/// Statements run while closed open a connection implicitly, which stays
/// checked out until the next `close`.
///
/// ```ignore
/// let pool = SqlitePool::connect("sqlite://app.db").await?;
/// let mut repo = Repository::new(SqliteExecutor::new(pool));
/// ```
pub struct SqliteExecutor {
    pool: SqlitePool,
    conn: Option<PoolConnection<Sqlite>>,
}

impl SqliteExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, conn: None }
    }

    /// Connect a fresh pool to `url` and wrap it.
    pub async fn connect(url: &str) -> SqlxResult<Self> {
        let pool = SqlitePool::connect(url)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether a connection is currently checked out.
    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    async fn acquire(&mut self) -> SqlxResult<()> {
        if self.conn.is_none() {
            let conn = self
                .pool
                .acquire()
                .await
                .map_err(SqlxErrorExt::into_data_error)?;
            tracing::debug!("sqlite connection acquired");
            self.conn = Some(conn);
        }
        Ok(())
    }

    async fn connection(&mut self) -> SqlxResult<&mut SqliteConnection> {
        self.acquire().await?;
        self.conn
            .as_mut()
            .map(|conn| &mut **conn)
            .ok_or_else(|| DataError::Other("sqlite connection unavailable".into()))
    }

    async fn fetch(&mut self, sql: &str, params: Vec<Parameter>) -> SqlxResult<RowSet> {
        let (sql, names) = rewrite_named(sql);
        let values = bind_order(&names, &params)?;
        tracing::debug!(sql = %sql, params = values.len(), "sqlite query");
        let conn = self.connection().await?;

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }
        let rows = query
            .fetch_all(conn)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        to_row_set(&rows)
    }
}

impl CommandExecutor for SqliteExecutor {
    type Cursor = RowSet;

    async fn open(&mut self) -> Result<(), DataError> {
        self.acquire().await
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            tracing::debug!("sqlite connection released");
        }
    }

    async fn execute_query(&mut self, sql: &str) -> Result<RowSet, DataError> {
        self.fetch(sql, Vec::new()).await
    }

    async fn execute_with_parameters(
        &mut self,
        sql: &str,
        params: Vec<Parameter>,
    ) -> Result<RowSet, DataError> {
        self.fetch(sql, params).await
    }

    async fn execute_non_query(
        &mut self,
        sql: &str,
        params: Vec<Parameter>,
    ) -> Result<u64, DataError> {
        let (sql, names) = rewrite_named(sql);
        let values = bind_order(&names, &params)?;
        tracing::debug!(sql = %sql, params = values.len(), "sqlite statement");
        let conn = self.connection().await?;

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }
        let result = query
            .execute(conn)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected())
    }
}

/// Values for `names`, in order. Exact name match first, then ASCII
/// case-insensitive.
fn bind_order(names: &[String], params: &[Parameter]) -> SqlxResult<Vec<Value>> {
    names
        .iter()
        .map(|name| {
            params
                .iter()
                .find(|p| p.name == *name)
                .or_else(|| params.iter().find(|p| p.name.eq_ignore_ascii_case(name)))
                .map(|p| p.value.clone())
                .ok_or_else(|| DataError::executor(UnboundParameter { name: name.clone() }))
        })
        .collect()
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(v) => query.bind(v),
        Value::Int32(v) => query.bind(v),
        Value::Int64(v) => query.bind(v),
        Value::Float(v) => query.bind(v),
        Value::Double(v) => query.bind(v),
        Value::Text(v) => query.bind(v),
        Value::Timestamp(v) => query.bind(v),
        Value::Bytes(v) => query.bind(v),
    }
}

fn to_row_set(rows: &[SqliteRow]) -> SqlxResult<RowSet> {
    let Some(first) = rows.first() else {
        return Ok(RowSet::default());
    };
    let columns = first
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    let mut set = RowSet::new(columns);
    for row in rows {
        let values = (0..row.len())
            .map(|index| decode_column(row, index))
            .collect::<Result<Vec<_>, _>>()?;
        set.push_row(values);
    }
    Ok(set)
}

/// Decode by the value's storage class; declared column types are ignored.
fn decode_column(row: &SqliteRow, index: usize) -> SqlxResult<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(SqlxErrorExt::into_data_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();
    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(index).map(Value::Int64),
        "REAL" | "NUMERIC" => row.try_get::<f64, _>(index).map(Value::Double),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        _ => row.try_get::<String, _>(index).map(Value::Text),
    };
    value.map_err(SqlxErrorExt::into_data_error)
}
