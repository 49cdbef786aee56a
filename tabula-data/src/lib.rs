//! # tabula-data: mapping core for Tabula
//!
//! Derives a table/column mapping from a statically declared entity shape,
//! generates and caches parameterized SQL for it, and materializes result
//! rows back into typed entities. Talking to an actual database is left to a
//! [`CommandExecutor`] implementation such as `tabula-data-sqlx`.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Entity`] | Static schema binding for a struct (usually `#[derive(Entity)]`) |
//! | [`SchemaDescriptor`] | Table name, identity column and ordered field ↔ column map |
//! | [`StatementGenerator`] | Cached select / paged / insert / update / delete text |
//! | [`Materializer`] | Cursor rows → entities, lenient or strict |
//! | [`Repository`] | Ties the above to an executor |
//!
//! # Security
//!
//! The `filter` and `order` arguments accepted throughout are raw SQL
//! fragments inserted verbatim. Never build them from user input; bind
//! values as parameters (`@0`, `@1`, ... or `@Column`) instead.

extern crate self as tabula_data;

pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod materialize;
pub mod page;
pub mod repository;
pub mod schema;
pub mod statement;
pub mod value;

pub use config::MapperConfig;
pub use entity::{Entity, FieldDef, Shape};
pub use error::{ConfigError, DataError, FieldAssignmentError, ShapeError};
pub use executor::{CommandExecutor, Cursor, DbType, Parameter, RowSet, Session, PARAM_MARKER};
pub use materialize::{AssignmentPolicy, Materializer};
pub use page::Pageable;
pub use repository::Repository;
pub use schema::{FieldMapping, SchemaDescriptor, SchemaRegistry};
pub use statement::{SqlCompat, StatementGenerator, StatementKind, StatementOptions};
pub use value::{AssignError, FromValue, Value};

/// Derive macro generating the [`Entity`] binding.
pub use tabula_macros::Entity;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::params;
    pub use crate::{
        CommandExecutor, DataError, Entity, MapperConfig, Pageable, Repository, Value,
    };
}
