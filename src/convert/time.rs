//! Timestamp encoding.
//!
//! Stored as RFC 3339 UTC text with nanosecond precision. The fixed width
//! keeps lexicographic order equal to chronological order, so range filters
//! compare stored text directly.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::db::SqlValue;
use crate::error::AppError;

pub fn encode(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode(text: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| AppError::Conversion(format!("Invalid timestamp '{}': {}", text, e)))
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(at: DateTime<Utc>) -> Self {
        SqlValue::Text(encode(&at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encode_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(encode(&whole), "2024-03-01T12:00:00.000000000Z");
    }

    #[test]
    fn test_text_order_matches_time_order() {
        let earlier = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let later = earlier + chrono::Duration::nanoseconds(5);
        assert!(encode(&earlier) < encode(&later));
    }

    #[test]
    fn test_round_trip_keeps_nanoseconds() {
        let now = Utc::now();
        assert_eq!(decode(&encode(&now)).unwrap(), now);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("yesterday"), Err(AppError::Conversion(_))));
    }
}
