//! # tabula-data-sqlx: SQLx backend for Tabula
//!
//! Provides a [`CommandExecutor`](tabula_data::CommandExecutor) on top of a
//! [SQLx](https://github.com/launchbadge/sqlx) SQLite pool, so a
//! [`Repository`](tabula_data::Repository) can run against a real database.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqliteExecutor`] | Pool-backed executor; one checked-out connection per open session |
//! | [`rewrite_named`] | `@name` placeholders → SQLite `?N` placeholders |
//! | [`SqlxErrorExt`] | `sqlx::Error` → `DataError` (`.into_data_error()`) |
//!
//! # SQLite notes
//!
//! The generated delete statement omits `FROM` by default, which SQLite
//! rejects. Use [`SqlCompat::corrected`](tabula_data::SqlCompat::corrected)
//! when targeting SQLite:
//!
//! ```ignore
//! use tabula_data::{Repository, SqlCompat, StatementOptions};
//! use tabula_data_sqlx::SqliteExecutor;
//!
//! let options = StatementOptions { schema: None, compat: SqlCompat::corrected() };
//! let mut repo = Repository::new(SqliteExecutor::new(pool)).with_options(options);
//! ```

pub mod error;
pub mod executor;
pub mod rewrite;

pub use error::{SqlxErrorExt, SqlxResult, UnboundParameter};
pub use executor::SqliteExecutor;
pub use rewrite::rewrite_named;

/// Re-exports of the most commonly used types from both `tabula-data` and this crate.
pub mod prelude {
    pub use crate::{SqliteExecutor, SqlxErrorExt};
    pub use tabula_data::prelude::*;
}
