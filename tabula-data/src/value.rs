use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A single scalar flowing across the executor boundary, either as a bound
/// parameter or as a cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "i32",
            Value::Int64(_) => "i64",
            Value::Float(_) => "f32",
            Value::Double(_) => "f64",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Bytes(_) => "bytes",
        }
    }
}

/// Why a value could not be written into an entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignError {
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    OutOfRange { target: &'static str },
    Parse { target: &'static str, input: String },
    /// The entity binding has no field with this name.
    UnknownField(String),
}

impl std::fmt::Display for AssignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignError::Mismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            AssignError::OutOfRange { target } => write!(f, "value out of range for {target}"),
            AssignError::Parse { target, input } => {
                write!(f, "cannot parse {input:?} as {target}")
            }
            AssignError::UnknownField(field) => write!(f, "unknown field `{field}`"),
        }
    }
}

impl std::error::Error for AssignError {}

/// Trait for converting a [`Value`] into a concrete field type.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as an entity field type",
    label = "not a mappable scalar",
    note = "built-in types: bool, i32, i64, f32, f64, String, NaiveDateTime, Vec<u8>, Option<T>. Implement `FromValue` for custom types."
)]
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, AssignError>;
}

fn mismatch(expected: &'static str, value: &Value) -> AssignError {
    AssignError::Mismatch {
        expected,
        found: value.type_name(),
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int32(0) | Value::Int64(0) => Ok(false),
            Value::Int32(1) | Value::Int64(1) => Ok(true),
            Value::Int32(_) | Value::Int64(_) => Err(AssignError::OutOfRange { target: "bool" }),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Int32(i) => Ok(*i),
            Value::Int64(i) => i32::try_from(*i).map_err(|_| AssignError::OutOfRange { target: "i32" }),
            other => Err(mismatch("i32", other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Int32(i) => Ok(i64::from(*i)),
            Value::Int64(i) => Ok(*i),
            other => Err(mismatch("i64", other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Float(f) => Ok(*f),
            // Most drivers only hand back double precision.
            Value::Double(f) => {
                if f.is_finite() && f.abs() > f64::from(f32::MAX) {
                    Err(AssignError::OutOfRange { target: "f32" })
                } else {
                    Ok(*f as f32)
                }
            }
            Value::Int32(i) => Ok(*i as f32),
            other => Err(mismatch("f32", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Double(f) => Ok(*f),
            Value::Float(f) => Ok(f64::from(*f)),
            Value::Int32(i) => Ok(f64::from(*i)),
            other => Err(mismatch("f64", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => Err(mismatch("String", other)),
        }
    }
}

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            // SQLite and friends hand timestamps back as text.
            Value::Text(s) => parse_timestamp(s).ok_or_else(|| AssignError::Parse {
                target: "NaiveDateTime",
                input: s.clone(),
            }),
            other => Err(mismatch("NaiveDateTime", other)),
        }
    }
}

fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(input, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(mismatch("Vec<u8>", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

macro_rules! value_from {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    f32 => Float,
    f64 => Double,
    String => Text,
    NaiveDateTime => Timestamp,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Build a positional parameter list from heterogeneous scalars.
///
/// ```ignore
/// let users: Vec<User> = repo.select("Age > @0 AND Name = @1", "", params![18, "bob"]).await?;
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ( $( $value:expr ),+ $(,)? ) => {
        ::std::vec![ $( $crate::Value::from($value) ),+ ]
    };
}
