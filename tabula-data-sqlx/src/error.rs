use tabula_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// `From<sqlx::Error> for DataError` would break the orphan rule here, so
/// conversions go through `.into_data_error()`.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        DataError::executor(self)
    }
}

/// A placeholder in the statement text with no matching parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnboundParameter {
    pub name: String,
}

impl std::fmt::Display for UnboundParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no value bound for parameter @{}", self.name)
    }
}

impl std::error::Error for UnboundParameter {}

/// Convenience alias for results produced by this crate.
pub type SqlxResult<T> = Result<T, DataError>;
