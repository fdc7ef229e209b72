//! Enum kinds, stored either by ordinal or by name.

use std::fmt;
use std::marker::PhantomData;

use super::{integer_from, text_from, ValueKind};
use crate::error::ConversionError;
use crate::value::{SqlValue, StorageKind, ValueRef};

/// A fieldless enum that can be persisted.
///
/// `VARIANTS` fixes both the ordinal (position) and the accepted names.
///
/// ```rust
/// use oxide_query_core::types::SqlEnum;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status { Draft, Published }
///
/// impl SqlEnum for Status {
///     const VARIANTS: &'static [Self] = &[Self::Draft, Self::Published];
///
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Draft => "draft",
///             Self::Published => "published",
///         }
///     }
/// }
/// ```
pub trait SqlEnum: fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    /// All variants in ordinal order.
    const VARIANTS: &'static [Self];

    /// Stable persisted name of the variant.
    fn name(&self) -> &'static str;

    /// Position of the variant in [`SqlEnum::VARIANTS`].
    fn ordinal(&self) -> usize {
        Self::VARIANTS
            .iter()
            .position(|v| v == self)
            .unwrap_or_default()
    }
}

/// Enum stored as its ordinal.
pub struct EnumOrdinal<E>(PhantomData<E>);

/// Enum stored as its name.
pub struct EnumName<E>(PhantomData<E>);

macro_rules! marker_impls {
    ($ty:ident) => {
        impl<E> Default for $ty<E> {
            fn default() -> Self {
                Self(PhantomData)
            }
        }

        impl<E> Clone for $ty<E> {
            fn clone(&self) -> Self {
                Self(PhantomData)
            }
        }

        impl<E> fmt::Debug for $ty<E> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}<{}>", stringify!($ty), std::any::type_name::<E>())
            }
        }
    };
}

marker_impls!(EnumOrdinal);
marker_impls!(EnumName);

impl<E: SqlEnum> ValueKind for EnumOrdinal<E> {
    type Value = E;

    fn name(&self) -> &'static str {
        "enum ordinal"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Integer
    }

    fn encode(&self, value: &E) -> Result<SqlValue, ConversionError> {
        i64::try_from(value.ordinal())
            .map(SqlValue::Integer)
            .map_err(|_| ConversionError::OutOfRange {
                target: "enum ordinal",
                value: format!("{value:?}"),
            })
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<E, ConversionError> {
        if let ValueRef::Text(s) = value {
            if let Some(variant) = E::VARIANTS.iter().find(|v| v.name() == s) {
                return Ok(variant.clone());
            }
        }
        let ordinal = integer_from(value, "enum ordinal")?;
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| E::VARIANTS.get(i))
            .cloned()
            .ok_or_else(|| ConversionError::OutOfRange {
                target: "enum ordinal",
                value: ordinal.to_string(),
            })
    }
}

impl<E: SqlEnum> ValueKind for EnumName<E> {
    type Value = E;

    fn name(&self) -> &'static str {
        "enum name"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Text
    }

    fn encode(&self, value: &E) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Text(value.name().to_owned()))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<E, ConversionError> {
        let s = text_from(value, "enum name")?;
        E::VARIANTS
            .iter()
            .find(|v| v.name() == s)
            .cloned()
            .ok_or_else(|| ConversionError::Parse {
                target: "enum name",
                input: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Genre {
        Rock,
        Jazz,
        Folk,
    }

    impl SqlEnum for Genre {
        const VARIANTS: &'static [Self] = &[Self::Rock, Self::Jazz, Self::Folk];

        fn name(&self) -> &'static str {
            match self {
                Self::Rock => "rock",
                Self::Jazz => "jazz",
                Self::Folk => "folk",
            }
        }
    }

    #[test]
    fn test_enum_ordinal() {
        let kind = EnumOrdinal::<Genre>::default();
        assert_eq!(kind.encode(&Genre::Folk), Ok(SqlValue::Integer(2)));
        assert_eq!(kind.decode(ValueRef::Integer(1)), Ok(Genre::Jazz));
        assert_eq!(kind.decode(ValueRef::Text("rock")), Ok(Genre::Rock));
        assert!(kind.decode(ValueRef::Integer(3)).is_err());
        assert!(kind.decode(ValueRef::Integer(-1)).is_err());
    }

    #[test]
    fn test_enum_name() {
        let kind = EnumName::<Genre>::default();
        assert_eq!(
            kind.encode(&Genre::Jazz),
            Ok(SqlValue::Text(String::from("jazz")))
        );
        assert_eq!(kind.decode(ValueRef::Text("folk")), Ok(Genre::Folk));
        assert!(kind.decode(ValueRef::Text("polka")).is_err());
        assert!(kind.decode(ValueRef::Integer(0)).is_err());
    }
}
