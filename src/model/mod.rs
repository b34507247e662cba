//! Typed records and request payloads for every stored resource.
//!
//! `*Row` types are what listings return (with joined display names);
//! `New*` types are validated create/update payloads.

pub mod master;
pub mod status;
pub mod work;

pub use master::*;
pub use status::*;
pub use work::*;

/// Lenient (de)serialisation of wall-clock timestamps.
///
/// Accepts every form `date_util::parse_timestamp` understands, including the
/// minute-precision `YYYY-MM-DDTHH:MM` that date-time inputs produce.
pub mod serde_ts {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer};

    use crate::date_util::{parse_date, parse_timestamp};

    pub fn optional<'de, D>(d: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse_timestamp(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {s}"))),
        }
    }

    /// Optional calendar date; an empty string counts as absent.
    pub fn optional_date<'de, D>(d: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => parse_date(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date: {s}"))),
        }
    }
}
