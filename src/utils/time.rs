//! RFC 3339 timestamps for serde.
//!
//! Use with `#[serde(with = "crate::utils::time")]` on an `OffsetDateTime` field. Values are
//! written in UTC at whole-second precision (`2024-05-01T12:00:00Z`).

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

/// Returns the current UTC time truncated to whole seconds.
pub fn now_utc_seconds() -> OffsetDateTime {
    truncate_to_seconds(OffsetDateTime::now_utc())
}

fn truncate_to_seconds(datetime: OffsetDateTime) -> OffsetDateTime {
    datetime.replace_nanosecond(0).unwrap_or(datetime)
}

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted UTC string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = truncate_to_seconds(datetime.to_offset(UtcOffset::UTC))
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::macros::datetime;

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Stamped {
        #[serde(with = "crate::utils::time")]
        at: OffsetDateTime,
    }

    #[test]
    fn writes_utc_whole_seconds() {
        let stamped = Stamped {
            at: datetime!(2024-05-01 14:00:00.75 +02:00),
        };
        assert_eq!(
            serde_json::to_string(&stamped).unwrap(),
            r#"{"at":"2024-05-01T12:00:00Z"}"#
        );
    }

    #[test]
    fn reads_rfc3339() {
        let stamped: Stamped = serde_json::from_str(r#"{"at":"2024-05-01T12:00:00Z"}"#).unwrap();
        assert_eq!(stamped.at, datetime!(2024-05-01 12:00:00 UTC));
        assert!(serde_json::from_str::<Stamped>(r#"{"at":"yesterday"}"#).is_err());
    }

    #[test]
    fn now_has_no_fraction() {
        assert_eq!(now_utc_seconds().nanosecond(), 0);
    }
}
