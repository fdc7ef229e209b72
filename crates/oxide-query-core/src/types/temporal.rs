//! Date and time kinds stored as ISO-8601 text.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use super::{text_from, ValueKind};
use crate::error::ConversionError;
use crate::value::{SqlValue, StorageKind, ValueRef};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATETIME_T_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn parse_error(target: &'static str, input: &str) -> ConversionError {
    ConversionError::Parse {
        target,
        input: input.to_owned(),
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, DATETIME_T_FORMAT))
        .ok()
}

/// Calendar date, `YYYY-MM-DD`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Date;

impl ValueKind for Date {
    type Value = NaiveDate;

    fn name(&self) -> &'static str {
        "date"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Text
    }

    fn declared_type(&self) -> &'static str {
        "DATE"
    }

    fn encode(&self, value: &NaiveDate) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Text(value.format(DATE_FORMAT).to_string()))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<NaiveDate, ConversionError> {
        let s = text_from(value, "date")?.trim();
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .or_else(|| parse_naive_datetime(s).map(|dt| dt.date()))
            .ok_or_else(|| parse_error("date", s))
    }
}

/// Time of day, `HH:MM:SS[.fff]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Time;

impl ValueKind for Time {
    type Value = NaiveTime;

    fn name(&self) -> &'static str {
        "time"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Text
    }

    fn declared_type(&self) -> &'static str {
        "TIME"
    }

    fn encode(&self, value: &NaiveTime) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Text(value.format(TIME_FORMAT).to_string()))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<NaiveTime, ConversionError> {
        let s = text_from(value, "time")?.trim();
        NaiveTime::parse_from_str(s, TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map_err(|_| parse_error("time", s))
    }
}

/// Local date and time without offset, `YYYY-MM-DD HH:MM:SS[.fff]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateTime;

impl ValueKind for DateTime {
    type Value = NaiveDateTime;

    fn name(&self) -> &'static str {
        "datetime"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Text
    }

    fn declared_type(&self) -> &'static str {
        "DATETIME"
    }

    fn encode(&self, value: &NaiveDateTime) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Text(value.format(DATETIME_FORMAT).to_string()))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<NaiveDateTime, ConversionError> {
        let s = text_from(value, "datetime")?.trim();
        parse_naive_datetime(s)
            .or_else(|| {
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| parse_error("datetime", s))
    }
}

/// UTC instant stored as RFC 3339 text.
///
/// Integers are read as milliseconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timestamp;

impl ValueKind for Timestamp {
    type Value = chrono::DateTime<Utc>;

    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn storage(&self) -> StorageKind {
        StorageKind::Text
    }

    fn declared_type(&self) -> &'static str {
        "TIMESTAMP"
    }

    fn encode(&self, value: &chrono::DateTime<Utc>) -> Result<SqlValue, ConversionError> {
        Ok(SqlValue::Text(
            value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ))
    }

    fn decode(&self, value: ValueRef<'_>) -> Result<chrono::DateTime<Utc>, ConversionError> {
        if let ValueRef::Integer(ms) = value {
            return chrono::DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                ConversionError::OutOfRange {
                    target: "timestamp",
                    value: ms.to_string(),
                }
            });
        }
        let s = text_from(value, "timestamp")?.trim();
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| parse_naive_datetime(s).map(|dt| dt.and_utc()))
            .ok_or_else(|| parse_error("timestamp", s))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_date_round_trip() {
        let d = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(
            Date.encode(&d),
            Ok(SqlValue::Text(String::from("1999-12-31")))
        );
        assert_eq!(Date.decode(ValueRef::Text("1999-12-31")), Ok(d));
        assert_eq!(Date.decode(ValueRef::Text("1999-12-31 10:00:00")), Ok(d));
        assert!(Date.decode(ValueRef::Text("31/12/1999")).is_err());
        assert!(Date.decode(ValueRef::Integer(19_991_231)).is_err());
    }

    #[test]
    fn test_time_round_trip() {
        let t = NaiveTime::from_hms_milli_opt(23, 59, 58, 250).unwrap();
        let stored = Time.encode(&t).unwrap();
        assert_eq!(Time.decode(stored.as_value_ref()), Ok(t));
        assert_eq!(
            Time.decode(ValueRef::Text("08:15")),
            Ok(NaiveTime::from_hms_opt(8, 15, 0).unwrap())
        );
    }

    #[test]
    fn test_datetime_accepts_both_separators() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(12, 0, 1)
            .unwrap();
        assert_eq!(
            DateTime.encode(&dt),
            Ok(SqlValue::Text(String::from("2024-02-29 12:00:01")))
        );
        assert_eq!(DateTime.decode(ValueRef::Text("2024-02-29T12:00:01")), Ok(dt));
    }

    #[test]
    fn test_timestamp_text_and_epoch_millis() {
        let ts = Utc.with_ymd_and_hms(2021, 6, 1, 9, 30, 0).unwrap();
        let stored = Timestamp.encode(&ts).unwrap();
        assert_eq!(stored, SqlValue::Text(String::from("2021-06-01T09:30:00Z")));
        assert_eq!(Timestamp.decode(stored.as_value_ref()), Ok(ts));
        assert_eq!(
            Timestamp.decode(ValueRef::Integer(ts.timestamp_millis())),
            Ok(ts)
        );
        assert_eq!(
            Timestamp.coerce(SqlValue::Text(String::from("2021-06-01T11:30:00+02:00"))),
            Ok(stored)
        );
    }
}
