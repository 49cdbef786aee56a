use crate::value::{AssignError, Value};

/// Static description of one field of an entity shape.
///
/// Built with `const` combinators so a whole field table can live in a
/// `static` slice:
///
/// ```ignore
/// const FIELDS: &[FieldDef] = &[
///     FieldDef::new("id").key(),
///     FieldDef::new("name").column("user_name"),
/// ];
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub key: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            column: None,
            key: false,
        }
    }

    /// Map the field to a column with a different name.
    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    /// Mark the field as the identity of the entity.
    pub const fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// The column this field is stored in.
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }
}

/// The shape of an entity type: its bare name, optional table override and
/// fields in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub name: &'static str,
    pub table: Option<&'static str>,
    pub fields: &'static [FieldDef],
}

impl Shape {
    pub const fn new(name: &'static str, fields: &'static [FieldDef]) -> Self {
        Self {
            name,
            table: None,
            fields,
        }
    }

    pub const fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }
}

/// Trait representing a mappable entity: a static shape plus by-name field
/// access used by the materializer and the write operations.
///
/// Intended to be derived (`#[derive(Entity)]`) but can be implemented by hand.
///
/// # Example
///
/// ```ignore
/// impl Entity for User {
///     fn shape() -> Shape {
///         const FIELDS: &[FieldDef] = &[FieldDef::new("Id"), FieldDef::new("Name")];
///         Shape::new("User", FIELDS).table("Users")
///     }
///     fn assign(&mut self, field: &str, value: &Value) -> Result<(), AssignError> {
///         match field {
///             "Id" => self.id = FromValue::from_value(value)?,
///             "Name" => self.name = FromValue::from_value(value)?,
///             other => return Err(AssignError::UnknownField(other.to_string())),
///         }
///         Ok(())
///     }
///     fn values(&self) -> Vec<(&'static str, Value)> {
///         vec![("Id", self.id.into()), ("Name", self.name.clone().into())]
///     }
/// }
/// ```
pub trait Entity: Default + Send + Sync + Unpin + 'static {
    fn shape() -> Shape;

    /// Write one field from a column value. A failed conversion must leave
    /// the field untouched.
    fn assign(&mut self, field: &str, value: &Value) -> Result<(), AssignError>;

    /// Current field values, keyed by field name, in declaration order.
    fn values(&self) -> Vec<(&'static str, Value)>;
}
