//! Cached SQL text generation for one entity shape.
//!
//! Filter and order fragments are spliced into the statement verbatim. They
//! are never validated or escaped, so only pass text you control and bind
//! every user-supplied value as a parameter.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::DataError;
use crate::executor::PARAM_MARKER;
use crate::schema::SchemaDescriptor;

/// Operation kinds a generator caches text for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Paged,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Paged => "paged",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
        }
    }
}

/// Switches between the historical statement text and corrected variants.
///
/// The defaults reproduce the historical text byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqlCompat {
    /// Emit `DELETE <table>` rather than `DELETE FROM <table>`.
    pub delete_without_from: bool,
    /// Include the identity column in the `SET` list of updates.
    pub update_sets_identity: bool,
}

impl Default for SqlCompat {
    fn default() -> Self {
        Self {
            delete_without_from: true,
            update_sets_identity: true,
        }
    }
}

impl SqlCompat {
    /// Standard SQL for both statements.
    pub fn corrected() -> Self {
        Self {
            delete_without_from: false,
            update_sets_identity: false,
        }
    }
}

/// Knobs shared by every generator a repository creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementOptions {
    /// Schema qualifier used by the paged statement. `None` drops it.
    pub schema: Option<String>,
    pub compat: SqlCompat,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            schema: Some("dbo".to_string()),
            compat: SqlCompat::default(),
        }
    }
}

/// Builds SQL for one entity shape and remembers the reusable parts.
#[derive(Debug)]
pub struct StatementGenerator {
    descriptor: Arc<SchemaDescriptor>,
    options: StatementOptions,
    cache: HashMap<StatementKind, String>,
}

impl StatementGenerator {
    pub fn new(descriptor: Arc<SchemaDescriptor>) -> Self {
        Self::with_options(descriptor, StatementOptions::default())
    }

    pub fn with_options(descriptor: Arc<SchemaDescriptor>, options: StatementOptions) -> Self {
        Self {
            descriptor,
            options,
            cache: HashMap::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<SchemaDescriptor> {
        &self.descriptor
    }

    pub fn options(&self) -> &StatementOptions {
        &self.options
    }

    /// Previously generated text for an operation, if any.
    pub fn cached(&self, kind: StatementKind) -> Option<&str> {
        self.cache.get(&kind).map(String::as_str)
    }

    /// `SELECT * FROM <table>[ WHERE <filter>][ ORDER BY <order>]`
    pub fn generate_select(&mut self, filter: &str, order: &str) -> String {
        let mut sql = self.base(StatementKind::Select).to_string();
        append_where(&mut sql, filter);
        append_order(&mut sql, order);
        sql
    }

    /// `INSERT INTO <table> (<cols>) VALUES (@<cols>)`.
    ///
    /// A non-empty `filter` is appended as a `WHERE` clause exactly like the
    /// other statements; what that means for an insert is up to the database.
    pub fn generate_insert(&mut self, filter: &str) -> String {
        let mut sql = self.base(StatementKind::Insert).to_string();
        append_where(&mut sql, filter);
        sql
    }

    /// `UPDATE <table> SET <col> = @<col>, ... WHERE <filter | identity = @identity>`
    pub fn generate_update(&mut self, filter: &str) -> Result<String, DataError> {
        let mut sql = self.base(StatementKind::Update).to_string();
        self.append_identity_where(&mut sql, filter)?;
        Ok(sql)
    }

    /// `DELETE <table> WHERE <filter | identity = @identity>`
    pub fn generate_delete(&mut self, filter: &str) -> Result<String, DataError> {
        let mut sql = self.base(StatementKind::Delete).to_string();
        self.append_identity_where(&mut sql, filter)?;
        Ok(sql)
    }

    /// Row-number windowed select bounded by `@PageNum` and `@PageSize`.
    ///
    /// The whole statement, filter and order included, is cached by the first
    /// call. Later calls on the same generator return that text unchanged
    /// whatever arguments they pass; use a fresh generator for a different
    /// filter or ordering.
    pub fn generate_paged(&mut self, filter: &str, order: &str) -> String {
        if let Some(sql) = self.cache.get(&StatementKind::Paged) {
            if !filter.is_empty() || !order.is_empty() {
                tracing::trace!(
                    table = %self.descriptor.table_name(),
                    "paged statement already cached, ignoring filter/order"
                );
            }
            return sql.clone();
        }
        let sql = self.build_paged(filter, order);
        self.remember(StatementKind::Paged, sql.clone());
        sql
    }

    fn base(&mut self, kind: StatementKind) -> &str {
        if !self.cache.contains_key(&kind) {
            let sql = self.build_base(kind);
            self.remember(kind, sql);
        }
        &self.cache[&kind]
    }

    fn remember(&mut self, kind: StatementKind, sql: String) {
        tracing::trace!(
            kind = kind.as_str(),
            table = %self.descriptor.table_name(),
            "cached statement"
        );
        self.cache.insert(kind, sql);
    }

    fn build_base(&self, kind: StatementKind) -> String {
        let d = &self.descriptor;
        let table = d.table_name();
        match kind {
            StatementKind::Select => format!("SELECT * FROM {table}"),
            StatementKind::Insert => {
                let placeholders: Vec<String> = d
                    .columns()
                    .iter()
                    .map(|c| format!("{PARAM_MARKER}{c}"))
                    .collect();
                format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    d.columns().join(", "),
                    placeholders.join(", ")
                )
            }
            StatementKind::Update => {
                let identity = d.identity_name();
                let assignments: Vec<String> = d
                    .columns()
                    .iter()
                    .filter(|c| {
                        self.options.compat.update_sets_identity
                            || identity.is_empty()
                            || c.as_str() != identity
                    })
                    .map(|c| format!("{c} = {PARAM_MARKER}{c}"))
                    .collect();
                format!("UPDATE {table} SET {}", assignments.join(", "))
            }
            StatementKind::Delete => {
                if self.options.compat.delete_without_from {
                    format!("DELETE {table}")
                } else {
                    format!("DELETE FROM {table}")
                }
            }
            StatementKind::Paged => self.build_paged("", ""),
        }
    }

    fn build_paged(&self, filter: &str, order: &str) -> String {
        let d = &self.descriptor;
        let order = if !order.is_empty() {
            order
        } else if !d.identity_name().is_empty() {
            d.identity_name()
        } else {
            // describe() guarantees at least one column
            d.columns()[0].as_str()
        };
        let outer: Vec<String> = d.columns().iter().map(|c| format!("[t1].{c}")).collect();
        let inner: Vec<String> = d.columns().iter().map(|c| format!("[t0].{c}")).collect();
        let source = match &self.options.schema {
            Some(schema) => format!("[{schema}].[{}]", d.table_name()),
            None => format!("[{}]", d.table_name()),
        };

        let mut sql = format!("SELECT {}\n", outer.join(", "));
        sql.push_str(&format!(
            "FROM (SELECT ROW_NUMBER() OVER (ORDER BY {order}) AS [ROW_NUMBER], {} FROM {source} AS [t0]",
            inner.join(", ")
        ));
        append_where(&mut sql, filter);
        sql.push_str(") AS [t1]\n");
        sql.push_str("WHERE [t1].[ROW_NUMBER] BETWEEN @PageNum + 1 AND @PageNum + @PageSize\n");
        sql.push_str("ORDER BY [t1].[ROW_NUMBER]");
        sql
    }

    fn append_identity_where(&self, sql: &mut String, filter: &str) -> Result<(), DataError> {
        if !filter.is_empty() {
            append_where(sql, filter);
            return Ok(());
        }
        let identity = self.descriptor.identity_name();
        if identity.is_empty() {
            return Err(DataError::NoIdentity {
                table: self.descriptor.table_name().to_string(),
            });
        }
        sql.push_str(&format!(" WHERE {identity} = {PARAM_MARKER}{identity}"));
        Ok(())
    }
}

fn append_where(sql: &mut String, filter: &str) {
    if !filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
}

fn append_order(sql: &mut String, order: &str) {
    if !order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{FieldDef, Shape};

    fn users() -> StatementGenerator {
        const FIELDS: &[FieldDef] = &[FieldDef::new("Id"), FieldDef::new("Name")];
        let d = SchemaDescriptor::describe(&Shape::new("User", FIELDS).table("Users")).unwrap();
        StatementGenerator::new(Arc::new(d))
    }

    #[test]
    fn test_simple_select() {
        let mut g = users();
        assert_eq!(g.generate_select("", ""), "SELECT * FROM Users");
    }

    #[test]
    fn test_select_with_filter_and_order() {
        let mut g = users();
        assert_eq!(
            g.generate_select("Age > @0", "Name"),
            "SELECT * FROM Users WHERE Age > @0 ORDER BY Name"
        );
        assert_eq!(g.generate_select("", "Name DESC"), "SELECT * FROM Users ORDER BY Name DESC");
    }

    #[test]
    fn test_select_cache_holds_only_the_base() {
        let mut g = users();
        assert!(g.cached(StatementKind::Select).is_none());
        g.generate_select("Name = @0", "Id");
        assert_eq!(g.cached(StatementKind::Select), Some("SELECT * FROM Users"));
        assert_eq!(g.generate_select("Id = @0", ""), "SELECT * FROM Users WHERE Id = @0");
        assert_eq!(g.cached(StatementKind::Select), Some("SELECT * FROM Users"));
    }

    #[test]
    fn test_insert() {
        let mut g = users();
        assert_eq!(
            g.generate_insert(""),
            "INSERT INTO Users (Id, Name) VALUES (@Id, @Name)"
        );
        assert_eq!(
            g.generate_insert("1 = 1"),
            "INSERT INTO Users (Id, Name) VALUES (@Id, @Name) WHERE 1 = 1"
        );
        assert_eq!(
            g.cached(StatementKind::Insert),
            Some("INSERT INTO Users (Id, Name) VALUES (@Id, @Name)")
        );
    }

    #[test]
    fn test_insert_uses_renamed_columns() {
        const FIELDS: &[FieldDef] = &[
            FieldDef::new("name").column("Name"),
            FieldDef::new("id").column("Id"),
        ];
        let d = SchemaDescriptor::describe(&Shape::new("User", FIELDS).table("Users")).unwrap();
        let mut g = StatementGenerator::new(Arc::new(d));
        assert_eq!(
            g.generate_insert(""),
            "INSERT INTO Users (Name, Id) VALUES (@Name, @Id)"
        );
    }

    #[test]
    fn test_update_defaults_to_identity() {
        let mut g = users();
        assert_eq!(
            g.generate_update("").unwrap(),
            "UPDATE Users SET Id = @Id, Name = @Name WHERE Id = @Id"
        );
        assert_eq!(
            g.generate_update("Name = @Name").unwrap(),
            "UPDATE Users SET Id = @Id, Name = @Name WHERE Name = @Name"
        );
        assert_eq!(
            g.cached(StatementKind::Update),
            Some("UPDATE Users SET Id = @Id, Name = @Name")
        );
    }

    #[test]
    fn test_delete() {
        let mut g = users();
        assert_eq!(g.generate_delete("").unwrap(), "DELETE Users WHERE Id = @Id");
        assert_eq!(
            g.generate_delete("Name = @0").unwrap(),
            "DELETE Users WHERE Name = @0"
        );
    }

    #[test]
    fn test_corrected_compat() {
        const FIELDS: &[FieldDef] = &[FieldDef::new("Id"), FieldDef::new("Name")];
        let d = SchemaDescriptor::describe(&Shape::new("User", FIELDS).table("Users")).unwrap();
        let options = StatementOptions {
            schema: None,
            compat: SqlCompat::corrected(),
        };
        let mut g = StatementGenerator::with_options(Arc::new(d), options);
        assert_eq!(
            g.generate_update("").unwrap(),
            "UPDATE Users SET Name = @Name WHERE Id = @Id"
        );
        assert_eq!(g.generate_delete("").unwrap(), "DELETE FROM Users WHERE Id = @Id");
    }

    #[test]
    fn test_no_identity_requires_filter() {
        const FIELDS: &[FieldDef] = &[FieldDef::new("Name"), FieldDef::new("Email")];
        let d = SchemaDescriptor::describe(&Shape::new("Contact", FIELDS)).unwrap();
        let mut g = StatementGenerator::new(Arc::new(d));
        assert!(matches!(
            g.generate_delete(""),
            Err(DataError::NoIdentity { .. })
        ));
        assert!(matches!(
            g.generate_update(""),
            Err(DataError::NoIdentity { .. })
        ));
        assert_eq!(
            g.generate_delete("Email = @0").unwrap(),
            "DELETE Contact WHERE Email = @0"
        );
    }

    #[test]
    fn test_paged_layout() {
        let mut g = users();
        assert_eq!(
            g.generate_paged("", ""),
            "SELECT [t1].Id, [t1].Name\n\
             FROM (SELECT ROW_NUMBER() OVER (ORDER BY Id) AS [ROW_NUMBER], [t0].Id, [t0].Name FROM [dbo].[Users] AS [t0]) AS [t1]\n\
             WHERE [t1].[ROW_NUMBER] BETWEEN @PageNum + 1 AND @PageNum + @PageSize\n\
             ORDER BY [t1].[ROW_NUMBER]"
        );
    }

    #[test]
    fn test_paged_first_call_wins() {
        let mut g = users();
        let first = g.generate_paged("Name LIKE @0", "Name DESC");
        assert!(first.contains("OVER (ORDER BY Name DESC)"));
        assert!(first.contains("AS [t0] WHERE Name LIKE @0) AS [t1]"));
        let second = g.generate_paged("", "Id");
        assert_eq!(first, second);
        assert_eq!(g.cached(StatementKind::Paged), Some(first.as_str()));
    }

    #[test]
    fn test_paged_without_schema_or_identity() {
        const FIELDS: &[FieldDef] = &[FieldDef::new("Name"), FieldDef::new("Email")];
        let d = SchemaDescriptor::describe(&Shape::new("Contact", FIELDS)).unwrap();
        let options = StatementOptions {
            schema: None,
            ..StatementOptions::default()
        };
        let mut g = StatementGenerator::with_options(Arc::new(d), options);
        let sql = g.generate_paged("", "");
        assert!(sql.contains("OVER (ORDER BY Name)"));
        assert!(sql.contains("FROM [Contact] AS [t0]"));
    }
}
