use proc_macro::TokenStream;

mod crate_path;
mod entity_derive;

/// Derive the `Entity` schema binding for a struct with named fields.
///
/// # Struct attributes
///
/// - `#[entity(table = "...")]`: explicit table name; defaults to the
///   struct's own name, unmodified.
///
/// # Field attributes
///
/// - `#[entity(column = "...")]`: column name; defaults to the field name.
/// - `#[entity(key)]`: marks the identity column. Without one, the identity
///   is inferred from field names (`id`, then anything containing `id`).
/// - `#[entity(skip)]`: leave the field out of the mapping entirely.
///
/// Every mapped field type must implement `FromValue` and `Into<Value>`,
/// and the struct must implement `Default`.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Default, Entity)]
/// #[entity(table = "Users")]
/// pub struct User {
///     #[entity(key, column = "UserId")]
///     pub id: i64,
///     pub name: String,
///     pub email: Option<String>,
///     #[entity(skip)]
///     pub dirty: bool,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity_derive::expand(input)
}
