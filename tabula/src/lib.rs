//! Tabula: a lightweight data mapper.
//!
//! This facade crate re-exports the Tabula sub-crates through a single
//! dependency with feature flags:
//!
//! ```ignore
//! use tabula::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! #[entity(table = "Users")]
//! struct User {
//!     #[entity(key)]
//!     id: i64,
//!     name: String,
//! }
//!
//! let mut repo = Repository::new(executor);
//! let users: Vec<User> = repo.select("name LIKE @0", "id", params!["a%"]).await?;
//! ```
//!
//! # Feature flags
//!
//! | Feature  | Default | Crate              |
//! |----------|---------|--------------------|
//! | `sqlite` | no      | `tabula-data-sqlx` |

// The derive macro resolves its paths through `proc-macro-crate`; entities
// declared inside this crate refer to it by name.
extern crate self as tabula;

pub extern crate tabula_data;
pub extern crate tabula_macros;

pub use tabula_data::*;

#[cfg(feature = "sqlite")]
pub use tabula_data_sqlx;

#[cfg(feature = "sqlite")]
pub use tabula_data_sqlx::SqliteExecutor;

pub mod prelude {
    //! Everything needed to declare entities and run a repository.
    pub use tabula_data::prelude::*;

    #[cfg(feature = "sqlite")]
    pub use tabula_data_sqlx::SqliteExecutor;
}
