//! Timestamp utilities.
//!
//! Records carry ISO-8601 timestamps with millisecond precision
//! (`2024-05-01T12:30:00.125Z`), the same shape a browser's
//! `Date.prototype.toISOString` produces. The fixed width keeps the
//! string ordering used by the `by_createdAt` indexes identical to the
//! chronological ordering.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

/// Timestamp type used by every record.
pub type Timestamp = DateTime<Utc>;

/// Current time, truncated to whole milliseconds.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(3)
}

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A fresh `updatedAt` value that never moves backwards.
///
/// Two writes inside the same millisecond would otherwise stamp the same
/// value; the second one is pushed forward by 1 ms instead.
pub fn advance(previous: Timestamp) -> Timestamp {
    let current = now();
    if current > previous {
        current
    } else {
        previous + Duration::milliseconds(1)
    }
}

/// Format a timestamp the way it is persisted.
pub fn to_iso(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for `Timestamp` fields.
pub mod iso {
    use super::Timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a fixed-width ISO-8601 string.
    pub fn serialize<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::to_iso(ts))
    }

    /// Parse any RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<Timestamp>` fields.
pub mod iso_opt {
    use super::Timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as an ISO-8601 string or `null`.
    pub fn serialize<S: Serializer>(ts: &Option<Timestamp>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&super::to_iso(ts)),
            None => s.serialize_none(),
        }
    }

    /// Parse an optional RFC 3339 string.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Timestamp>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_timestamp_millis_is_reasonable() {
        let ts = now_timestamp_millis();
        // Should be after 2024-01-01 in millis
        assert!(ts > 1704067200_000, "Timestamp {} is too old", ts);
    }

    #[test]
    fn test_iso_format_is_fixed_width() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(to_iso(&ts), "2024-05-01T12:30:00.000Z");
    }

    #[test]
    fn test_advance_never_goes_backwards() {
        let future = now() + Duration::seconds(60);
        let next = advance(future);
        assert_eq!(next, future + Duration::milliseconds(1));

        let past = now() - Duration::seconds(60);
        assert!(advance(past) > past);
    }
}
