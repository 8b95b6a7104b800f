use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::error::EventError;

/// Instant normalized to UTC.
///
/// Values with a non-UTC offset are converted on construction, so equality
/// and ordering compare instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parse an RFC3339 date-time, normalizing any offset to UTC.
    pub fn parse(input: &str) -> Result<Self, EventError> {
        OffsetDateTime::parse(input, &Rfc3339)
            .map(Self::from_offset_datetime)
            .map_err(|_| EventError::InvalidTimestamp {
                value: input.to_owned(),
            })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    pub fn from_unix_micros(micros: i64) -> Result<Self, EventError> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
            .map(Self)
            .map_err(|_| EventError::TimestampOutOfRange { value: micros })
    }

    /// Microseconds since the Unix epoch, rounded toward negative infinity.
    pub fn unix_micros(self) -> i64 {
        let micros = self.0.unix_timestamp_nanos().div_euclid(1_000);
        i64::try_from(micros).unwrap_or(if micros < 0 { i64::MIN } else { i64::MAX })
    }

    /// Microseconds since the Unix epoch, rounded toward positive infinity.
    pub fn unix_micros_ceil(self) -> i64 {
        let floor = self.unix_micros();
        if self.0.unix_timestamp_nanos().rem_euclid(1_000) == 0 {
            floor
        } else {
            floor.saturating_add(1)
        }
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.0.to_string())
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn normalizes_offset_to_utc() {
        let shifted = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect("must parse");
        let utc = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(shifted, utc);
        assert_eq!(shifted.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn converts_through_unix_micros() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00.000001Z").expect("must parse");
        assert_eq!(parsed.unix_micros(), 1_704_067_200_000_001);
        assert_eq!(
            UtcDateTime::from_unix_micros(parsed.unix_micros()).expect("in range"),
            parsed
        );
    }

    #[test]
    fn rounds_sub_microsecond_bounds() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00.0000005Z").expect("must parse");
        assert_eq!(parsed.unix_micros(), 1_704_067_200_000_000);
        assert_eq!(parsed.unix_micros_ceil(), 1_704_067_200_000_001);
    }
}
