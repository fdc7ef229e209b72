//! Descriptors spanning more than one storage column.

use std::fmt;
use std::sync::Arc;

use chrono::{FixedOffset, Utc};

use super::{integer_from, Int32, Int64, PersistentType, TypeRef};
use crate::error::ConversionError;
use crate::value::{SqlValue, ValueRef};

/// A value kind stored across several single-column components.
///
/// Components are compared jointly: equality on a composite column is the
/// conjunction of the equalities of every component.
pub trait CompositeKind: fmt::Debug + Clone + Default + Send + Sync + 'static {
    /// The Rust value type.
    type Value: Clone + fmt::Debug + Send + Sync + 'static;

    /// Short name used in error messages.
    fn name(&self) -> &'static str;

    /// Column name suffix and descriptor of each component, in storage order.
    fn components(&self, nullable: bool) -> Vec<(&'static str, TypeRef)>;

    /// Splits a value into one storage value per component.
    fn split(&self, value: &Self::Value) -> Result<Vec<SqlValue>, ConversionError>;

    /// Rebuilds a value from non-NULL component values.
    fn join(&self, parts: &[ValueRef<'_>]) -> Result<Self::Value, ConversionError>;
}

/// A timestamp with its UTC offset, stored as UTC milliseconds plus the
/// offset in seconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct OffsetTimestamp;

impl CompositeKind for OffsetTimestamp {
    type Value = chrono::DateTime<FixedOffset>;

    fn name(&self) -> &'static str {
        "offset timestamp"
    }

    fn components(&self, nullable: bool) -> Vec<(&'static str, TypeRef)> {
        let millis: TypeRef = Arc::new(PersistentType::new(Int64).with_nullable(nullable));
        let offset: TypeRef = Arc::new(PersistentType::new(Int32).with_nullable(nullable));
        vec![("utc_ms", millis), ("offset_s", offset)]
    }

    fn split(&self, value: &Self::Value) -> Result<Vec<SqlValue>, ConversionError> {
        Ok(vec![
            SqlValue::Integer(value.timestamp_millis()),
            SqlValue::Integer(i64::from(value.offset().local_minus_utc())),
        ])
    }

    fn join(&self, parts: &[ValueRef<'_>]) -> Result<Self::Value, ConversionError> {
        let [millis, offset] = parts else {
            return Err(ConversionError::OutOfRange {
                target: "offset timestamp",
                value: format!("{} components", parts.len()),
            });
        };
        let millis = integer_from(*millis, "offset timestamp")?;
        let seconds = integer_from(*offset, "offset timestamp")?;
        let offset = i32::try_from(seconds)
            .ok()
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConversionError::OutOfRange {
                target: "offset timestamp",
                value: seconds.to_string(),
            })?;
        chrono::DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|utc| utc.with_timezone(&offset))
            .ok_or_else(|| ConversionError::OutOfRange {
                target: "offset timestamp",
                value: millis.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_offset_timestamp_split_join() {
        let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let value = tz.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let parts = OffsetTimestamp.split(&value).unwrap();
        assert_eq!(parts[1], SqlValue::Integer(19_800));

        let refs: Vec<_> = parts.iter().map(SqlValue::as_value_ref).collect();
        let back = OffsetTimestamp.join(&refs).unwrap();
        assert_eq!(back, value);
        assert_eq!(back.offset(), value.offset());
    }

    #[test]
    fn test_offset_timestamp_components() {
        let components = OffsetTimestamp.components(true);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].0, "utc_ms");
        assert!(components[1].1.is_nullable());
        assert!(OffsetTimestamp.join(&[ValueRef::Integer(0)]).is_err());
        assert!(OffsetTimestamp
            .join(&[ValueRef::Integer(0), ValueRef::Integer(100_000)])
            .is_err());
    }
}
