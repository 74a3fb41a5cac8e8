//! Millisecond-precision timestamps.

use std::fmt;
use std::ops::Sub;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Anything beyond this is outside chrono's representable range anyway.
const MAX_ABS_MILLIS: f64 = 1e18;

/// Absorbs binary representation error (`0.123` is stored as `0.12299...`)
/// before flooring; well below the microsecond resolution plugins send.
const REPRESENTATION_EPSILON_MILLIS: f64 = 1e-3;

/// A point in time truncated to whole milliseconds.
///
/// Plugins report time as fractional Unix seconds, storage keeps RFC 3339
/// text, and the fingerprint uses Unix milliseconds. Truncating on
/// construction keeps equality and hashing stable across all three forms.
///
/// The zero value (and [`Default`]) is the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomTime(DateTime<Utc>);

impl CustomTime {
    pub fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime.trunc_subsecs(3))
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Converts fractional Unix seconds, truncating to the millisecond like
    /// [`CustomTime::new`].
    #[expect(
        clippy::cast_possible_truncation,
        reason = "value is finite and range-checked before the cast"
    )]
    pub fn from_unix_seconds(seconds: f64) -> Option<Self> {
        let millis = (seconds * 1000.0 + REPRESENTATION_EPSILON_MILLIS).floor();
        if !millis.is_finite() || millis.abs() > MAX_ABS_MILLIS {
            return None;
        }
        Self::from_unix_millis(millis as i64)
    }

    pub fn parse_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| Self::new(dt.with_timezone(&Utc)))
    }

    pub fn is_zero(self) -> bool {
        self.unix_millis() == 0
    }

    pub const fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    pub fn unix_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "millisecond timestamps fit well within f64's exact integer range"
    )]
    pub fn unix_seconds(self) -> f64 {
        self.unix_millis() as f64 / 1000.0
    }

    /// RFC 3339 with millisecond precision, e.g. `2024-01-15T10:30:00.123Z`.
    ///
    /// The fixed width keeps lexicographic order equal to chronological order.
    pub fn to_rfc3339(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl From<DateTime<Utc>> for CustomTime {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl Sub for CustomTime {
    type Output = TimeDelta;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl fmt::Display for CustomTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl Serialize for CustomTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.unix_seconds())
    }
}

/// Accepted wire representations.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Seconds(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for CustomTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match RawTime::deserialize(deserializer)? {
            RawTime::Seconds(seconds) => Self::from_unix_seconds(seconds).ok_or_else(|| {
                serde::de::Error::custom(format!("timestamp out of range: {seconds}"))
            }),
            RawTime::Text(text) => Self::parse_rfc3339(&text).map_err(serde::de::Error::custom),
        }
    }
}
