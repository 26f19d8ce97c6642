//! Typed scalar reads.
//!
//! [`FromScalar`] turns the first cell of a result into a Rust value. Casts are strict: a
//! value of the wrong runtime type, or an integer that does not fit, is an
//! [`SqlHelperError::InvalidCast`]; a NULL or missing value is an
//! [`SqlHelperError::NullValue`] unless the target is an `Option`.

use chrono::NaiveDateTime;

use crate::error::SqlHelperError;
use crate::types::RowValues;

/// A type a scalar result can be read as.
pub trait FromScalar: Sized {
    /// Name reported in cast errors.
    const TYPE_NAME: &'static str;

    /// Convert a non-NULL value.
    ///
    /// # Errors
    /// Returns `SqlHelperError::InvalidCast` when `value` cannot be read as `Self`.
    fn from_value(value: RowValues) -> Result<Self, SqlHelperError>;

    /// Result for a NULL cell or a query that returned no row.
    ///
    /// # Errors
    /// Returns `SqlHelperError::NullValue` unless `Self` can represent absence.
    fn from_null() -> Result<Self, SqlHelperError> {
        Err(SqlHelperError::NullValue {
            expected: Self::TYPE_NAME,
        })
    }

    /// Convert the outcome of a scalar query.
    ///
    /// # Errors
    /// See [`FromScalar::from_value`] and [`FromScalar::from_null`].
    fn from_scalar(value: Option<RowValues>) -> Result<Self, SqlHelperError> {
        match value {
            None | Some(RowValues::Null) => Self::from_null(),
            Some(value) => Self::from_value(value),
        }
    }
}

fn invalid_cast(expected: &'static str, found: &RowValues) -> SqlHelperError {
    SqlHelperError::InvalidCast {
        expected,
        found: found.type_name(),
    }
}

macro_rules! integer_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromScalar for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
                    match value {
                        RowValues::Int(i) => {
                            <$t>::try_from(i).map_err(|_| invalid_cast(Self::TYPE_NAME, &value))
                        }
                        other => Err(invalid_cast(Self::TYPE_NAME, &other)),
                    }
                }
            }
        )*
    };
}

integer_scalar!(i64, i32, i16, u8, u32, u64, usize);

impl FromScalar for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        match value {
            RowValues::Float(f) => Ok(f),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(i) => Ok(i as f64),
            other => Err(invalid_cast(Self::TYPE_NAME, &other)),
        }
    }
}

impl FromScalar for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        match value {
            #[allow(clippy::cast_possible_truncation)]
            RowValues::Float(f) => Ok(f as f32),
            other => Err(invalid_cast(Self::TYPE_NAME, &other)),
        }
    }
}

impl FromScalar for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        value
            .as_bool()
            .ok_or_else(|| invalid_cast(Self::TYPE_NAME, &value))
    }
}

impl FromScalar for String {
    const TYPE_NAME: &'static str = "String";

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        match value {
            RowValues::Text(s) => Ok(s),
            other => Err(invalid_cast(Self::TYPE_NAME, &other)),
        }
    }
}

impl FromScalar for NaiveDateTime {
    const TYPE_NAME: &'static str = "NaiveDateTime";

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        value
            .as_timestamp()
            .ok_or_else(|| invalid_cast(Self::TYPE_NAME, &value))
    }
}

impl FromScalar for Vec<u8> {
    const TYPE_NAME: &'static str = "Vec<u8>";

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        match value {
            RowValues::Blob(bytes) => Ok(bytes),
            other => Err(invalid_cast(Self::TYPE_NAME, &other)),
        }
    }
}

impl FromScalar for serde_json::Value {
    const TYPE_NAME: &'static str = "serde_json::Value";

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        match value {
            RowValues::JSON(json) => Ok(json),
            other => Err(invalid_cast(Self::TYPE_NAME, &other)),
        }
    }
}

/// The untouched value; NULL stays `RowValues::Null`, only a missing row is an error.
impl FromScalar for RowValues {
    const TYPE_NAME: &'static str = "RowValues";

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        Ok(value)
    }

    fn from_scalar(value: Option<RowValues>) -> Result<Self, SqlHelperError> {
        value.map_or_else(Self::from_null, Ok)
    }
}

impl<T: FromScalar> FromScalar for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_value(value: RowValues) -> Result<Self, SqlHelperError> {
        T::from_value(value).map(Some)
    }

    fn from_null() -> Result<Self, SqlHelperError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_fit_or_fail() {
        assert_eq!(i32::from_scalar(Some(RowValues::Int(42))).unwrap(), 42);
        assert!(matches!(
            u8::from_scalar(Some(RowValues::Int(300))),
            Err(SqlHelperError::InvalidCast { expected: "u8", found: "Int" })
        ));
        assert!(matches!(
            u64::from_scalar(Some(RowValues::Int(-1))),
            Err(SqlHelperError::InvalidCast { .. })
        ));
    }

    #[test]
    fn wrong_runtime_type_is_invalid_cast() {
        let err = i64::from_scalar(Some(RowValues::Text("42".into()))).unwrap_err();
        assert!(matches!(
            err,
            SqlHelperError::InvalidCast { expected: "i64", found: "Text" }
        ));
        assert!(String::from_scalar(Some(RowValues::Int(1))).is_err());
    }

    #[test]
    fn null_and_missing() {
        assert!(matches!(
            i64::from_scalar(Some(RowValues::Null)),
            Err(SqlHelperError::NullValue { expected: "i64" })
        ));
        assert!(matches!(
            String::from_scalar(None),
            Err(SqlHelperError::NullValue { .. })
        ));
        assert_eq!(Option::<i64>::from_scalar(None).unwrap(), None);
        assert_eq!(Option::<i64>::from_scalar(Some(RowValues::Int(3))).unwrap(), Some(3));
        assert_eq!(RowValues::from_scalar(Some(RowValues::Null)).unwrap(), RowValues::Null);
    }

    #[test]
    fn widening_and_bool_reads() {
        assert!((f64::from_scalar(Some(RowValues::Int(2))).unwrap() - 2.0).abs() < f64::EPSILON);
        assert!(bool::from_scalar(Some(RowValues::Int(1))).unwrap());
        assert!(bool::from_scalar(Some(RowValues::Int(2))).is_err());
        assert!(f32::from_scalar(Some(RowValues::Int(2))).is_err());
    }
}
