use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Date-time of a journey entry as written in the source.
///
/// The wall-clock value is kept as-is; calendar grouping uses it directly and
/// never converts between offsets. The offset, when the source had one, is
/// carried only so the value serializes back the way it came in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

impl Timestamp {
    pub fn naive(local: NaiveDateTime) -> Self {
        Self { local, offset: None }
    }

    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Self::with_offset(dt));
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Ok(Self::with_offset(dt));
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(local) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Ok(Self::naive(local));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Self::naive)
            .ok_or_else(|| format!("invalid timestamp '{raw}'"))
    }

    fn with_offset(dt: DateTime<FixedOffset>) -> Self {
        Self {
            local: dt.naive_local(),
            offset: Some(*dt.offset()),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%dT%H:%M:%S%.f"))?;
        if let Some(offset) = self.offset {
            write!(f, "{offset}")?;
        }
        Ok(())
    }
}

impl FromStr for Timestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
