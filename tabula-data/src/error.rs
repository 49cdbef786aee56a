use crate::value::AssignError;

/// An entity shape that cannot be turned into a schema descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The shape declares no fields at all.
    NoFields { entity: &'static str },
    /// Two fields of the shape share the same name.
    DuplicateField {
        entity: &'static str,
        field: &'static str,
    },
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::NoFields { entity } => {
                write!(f, "Entity `{entity}` exposes no mappable fields")
            }
            ShapeError::DuplicateField { entity, field } => {
                write!(f, "Entity `{entity}` declares field `{field}` more than once")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

/// A single column value that could not be written into its entity field.
///
/// Under the lenient policy these are counted and dropped; under the strict
/// policy the first one aborts materialization.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignmentError {
    pub entity: &'static str,
    pub field: &'static str,
    pub column: String,
    pub source: AssignError,
}

impl std::fmt::Display for FieldAssignmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cannot assign column `{}` to `{}.{}`: {}",
            self.column, self.entity, self.field, self.source
        )
    }
}

impl std::error::Error for FieldAssignmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    Shape(ShapeError),
    FieldAssignment(FieldAssignmentError),
    /// An update or delete was requested without a filter on a shape with no
    /// resolvable identity column.
    NoIdentity { table: String },
    /// Any failure raised by the command executor, passed through untouched.
    Executor(Box<dyn std::error::Error + Send + Sync>),
    Other(String),
}

impl DataError {
    /// Construct an `Executor` variant from any error type.
    ///
    /// Used by executor crates (e.g. `tabula-data-sqlx`) to wrap
    /// driver-specific errors.
    pub fn executor(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Executor(Box::new(err))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Shape(err) => write!(f, "Shape error: {err}"),
            DataError::FieldAssignment(err) => write!(f, "Assignment error: {err}"),
            DataError::NoIdentity { table } => write!(
                f,
                "Table `{table}` has no identity column; supply an explicit filter"
            ),
            DataError::Executor(err) => write!(f, "Executor error: {err}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Shape(err) => Some(err),
            DataError::FieldAssignment(err) => Some(err),
            DataError::Executor(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ShapeError> for DataError {
    fn from(err: ShapeError) -> Self {
        DataError::Shape(err)
    }
}

impl From<FieldAssignmentError> for DataError {
    fn from(err: FieldAssignmentError) -> Self {
        DataError::FieldAssignment(err)
    }
}

/// Error type for loading mapper configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O or YAML parsing error occurred while reading the document.
    Load(String),
    /// A value was present but not acceptable (e.g. unknown policy name).
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid config value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
