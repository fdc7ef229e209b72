//! Integer, floating point, boolean and decimal kinds.

use rust_decimal::Decimal;

use super::{integer_from, real_from, ValueKind};
use crate::error::ConversionError;
use crate::value::{SqlValue, StorageKind, ValueRef};

/// Marker for kinds that support arithmetic and numeric aggregates.
pub trait Numeric: ValueKind {}

macro_rules! integer_kind {
    ($(#[$meta:meta])* $kind:ident, $ty:ty, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $kind;

        impl ValueKind for $kind {
            type Value = $ty;

            fn name(&self) -> &'static str {
                $name
            }

            fn storage(&self) -> StorageKind {
                StorageKind::Integer
            }

            fn encode(&self, value: &$ty) -> Result<SqlValue, ConversionError> {
                Ok(SqlValue::Integer(i64::from(*value)))
            }

            fn decode(&self, value: ValueRef<'_>) -> Result<$ty, ConversionError> {
                let wide = integer_from(value, $name)?;
                <$ty>::try_from(wide).map_err(|_| ConversionError::OutOfRange {
                    target: $name,
                    value: wide.to_string(),
                })
            }
        }

        impl Numeric for $kind {}
    };
}

integer_kind!(
    /// 8-bit signed integer.
    Int8,
    i8,
    "i8"
);
integer_kind!(
    /// 16-bit signed integer.
    Int16,
    i16,
    "i16"
);
integer_kind!(
    /// 32-bit signed integer.
    Int32,
    i32,
    "i32"
);
integer_kind!(
    /// 64-bit signed integer.
    Int64,
    i64,
    "i64"
);

/// 32-bit float stored as `REAL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Float32;

impl ValueKind for Float32 {
    type Value = f32;

    fn name(&self) -> &'static str {
        "f32"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Real
    }

    fn encode(&self, value: &f32) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Real(f64::from(*value)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn decode(&self, value: ValueRef<'_>) -> Result<f32, ConversionError> {
        let wide = real_from(value, "f32")?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(ConversionError::OutOfRange {
                target: "f32",
                value: wide.to_string(),
            });
        }
        Ok(wide as f32)
    }
}

impl Numeric for Float32 {}

/// 64-bit float stored as `REAL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Float64;

impl ValueKind for Float64 {
    type Value = f64;

    fn name(&self) -> &'static str {
        "f64"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Real
    }

    fn encode(&self, value: &f64) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Real(*value))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<f64, ConversionError> {
        real_from(value, "f64")
    }
}

impl Numeric for Float64 {}

/// Boolean stored as integer 0/1.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bool;

impl ValueKind for Bool {
    type Value = bool;

    fn name(&self) -> &'static str {
        "bool"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Integer
    }

    fn declared_type(&self) -> &'static str {
        "BOOLEAN"
    }

    fn encode(&self, value: &bool) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Integer(i64::from(*value)))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<bool, ConversionError> {
        match value {
            ValueRef::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            ValueRef::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => integer_from(other, "bool").map(|n| n != 0),
        }
    }
}

/// Arbitrary-precision decimal stored as an integer scaled by `10^scale`.
#[derive(Debug, Clone, Copy)]
pub struct DecimalKind {
    scale: u32,
}

impl DecimalKind {
    /// Largest scale a [`Decimal`] can carry.
    pub const MAX_SCALE: u32 = 28;

    /// Creates a decimal kind with the given number of fractional digits.
    ///
    /// Scales above [`DecimalKind::MAX_SCALE`] are clamped.
    #[must_use]
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale.min(Self::MAX_SCALE),
        }
    }

    /// Number of fractional digits kept in storage.
    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.scale
    }

    fn from_scaled(&self, scaled: i64) -> Result<Decimal, ConversionError> {
        Decimal::try_from_i128_with_scale(i128::from(scaled), self.scale).map_err(|_| {
            ConversionError::OutOfRange {
                target: "decimal",
                value: scaled.to_string(),
            }
        })
    }
}

impl Default for DecimalKind {
    fn default() -> Self {
        Self::new(2)
    }
}

impl ValueKind for DecimalKind {
    type Value = Decimal;

    fn name(&self) -> &'static str {
        "decimal"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Integer
    }

    fn encode(&self, value: &Decimal) -> Result<SqlValue, ConversionError> {
        let mut rounded = value.round_dp(self.scale);
        rounded.rescale(self.scale);
        i64::try_from(rounded.mantissa())
            .map(SqlValue::Integer)
            .map_err(|_| ConversionError::OutOfRange {
                target: "decimal",
                value: value.to_string(),
            })
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<Decimal, ConversionError> {
        match value {
            ValueRef::Integer(scaled) => self.from_scaled(scaled),
            ValueRef::Real(f) => Decimal::try_from(f)
                .map(|d| d.round_dp(self.scale))
                .map_err(|_| ConversionError::OutOfRange {
                    target: "decimal",
                    value: f.to_string(),
                }),
            ValueRef::Text(s) => s
                .trim()
                .parse::<Decimal>()
                .map(|d| d.round_dp(self.scale))
                .map_err(|_| ConversionError::Parse {
                    target: "decimal",
                    input: s.to_owned(),
                }),
            ValueRef::Null => Err(ConversionError::UnexpectedNull { target: "decimal" }),
            ValueRef::Blob(_) => Err(ConversionError::Incompatible {
                target: "decimal",
                from: "BLOB",
            }),
        }
    }

    fn coerce(&self, value: SqlValue) -> Result<SqlValue, ConversionError> {
        // Integers handed to a decimal slot are whole numbers, not scaled values.
        match value {
            SqlValue::Integer(n) => self.encode(&Decimal::from(n)),
            other => {
                let decoded = self.decode(other.as_value_ref())?;
                self.encode(&decoded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn round_trip<K: ValueKind>(kind: &K, value: &K::Value) -> K::Value {
        let stored = kind.encode(value).expect("encode");
        kind.decode(stored.as_value_ref()).expect("decode")
    }

    #[test]
    fn test_integer_boundaries() {
        assert_eq!(round_trip(&Int8, &i8::MIN), i8::MIN);
        assert_eq!(round_trip(&Int8, &i8::MAX), i8::MAX);
        assert_eq!(round_trip(&Int16, &i16::MIN), i16::MIN);
        assert_eq!(round_trip(&Int32, &i32::MAX), i32::MAX);
        assert_eq!(round_trip(&Int64, &i64::MIN), i64::MIN);
        assert_eq!(round_trip(&Int64, &i64::MAX), i64::MAX);
    }

    #[test]
    fn test_integer_narrowing() {
        assert_eq!(Int8.decode(ValueRef::Integer(127)), Ok(127));
        assert_eq!(
            Int8.decode(ValueRef::Integer(128)),
            Err(ConversionError::OutOfRange {
                target: "i8",
                value: String::from("128"),
            })
        );
        assert_eq!(
            Int32.coerce(SqlValue::Text(String::from("42"))),
            Ok(SqlValue::Integer(42))
        );
        assert!(Int32.coerce(SqlValue::Blob(vec![1])).is_err());
    }

    #[test]
    fn test_float_round_trip() {
        assert_eq!(round_trip(&Float32, &f32::MAX), f32::MAX);
        assert_eq!(round_trip(&Float32, &f32::MIN_POSITIVE), f32::MIN_POSITIVE);
        assert_eq!(round_trip(&Float64, &f64::MIN), f64::MIN);
        assert_eq!(Float64.decode(ValueRef::Integer(3)), Ok(3.0));
        assert!(Float32.decode(ValueRef::Real(1e300)).is_err());
    }

    #[test]
    fn test_bool() {
        assert!(round_trip(&Bool, &true));
        assert!(!round_trip(&Bool, &false));
        assert_eq!(Bool.decode(ValueRef::Text("TRUE")), Ok(true));
        assert_eq!(Bool.coerce(SqlValue::Integer(7)), Ok(SqlValue::Integer(1)));
    }

    #[test]
    fn test_decimal_scaled_storage() {
        let kind = DecimalKind::new(2);
        let price = Decimal::from_str("12.345").unwrap();
        assert_eq!(kind.encode(&price), Ok(SqlValue::Integer(1234)));
        assert_eq!(
            kind.decode(ValueRef::Integer(1234)),
            Ok(Decimal::from_str("12.34").unwrap())
        );
        assert_eq!(kind.coerce(SqlValue::Integer(3)), Ok(SqlValue::Integer(300)));
        assert_eq!(
            kind.coerce(SqlValue::Text(String::from("0.5"))),
            Ok(SqlValue::Integer(50))
        );
    }

    #[test]
    fn test_decimal_round_trip_at_scale() {
        let kind = DecimalKind::new(4);
        let value = Decimal::from_str("-98765.4321").unwrap();
        assert_eq!(round_trip(&kind, &value), value);
    }
}
