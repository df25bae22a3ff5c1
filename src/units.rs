use std::{fmt::Display, time::Duration};

use anyhow::{bail, Context};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Clone, Copy)]
pub struct Seconds(u16);

impl Display for Seconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Seconds {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<Seconds> for Duration {
    fn from(value: Seconds) -> Self {
        Duration::from_secs(value.0.into())
    }
}

/// Time of day after which no further messages are sent in a run
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Clone, Copy)]
#[serde(try_from = "String")]
pub struct CutoffTime(NaiveTime);

impl CutoffTime {
    pub fn new(time: NaiveTime) -> Self {
        Self(time)
    }

    /// True when `now` is strictly later than the cutoff on the same calendar day
    pub fn has_passed(&self, now: NaiveDateTime) -> bool {
        now.time() > self.0
    }
}

impl Default for CutoffTime {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(17, 30, 0).unwrap_or(NaiveTime::MIN))
    }
}

impl Display for CutoffTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl TryFrom<&str> for CutoffTime {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            bail!("cutoff time is empty");
        }
        let time = NaiveTime::parse_from_str(value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .with_context(|| {
                format!("Failed to parse cutoff time {value:?}, expected HH:MM or HH:MM:SS")
            })?;
        Ok(Self(time))
    }
}

impl TryFrom<String> for CutoffTime {
    type Error = anyhow::Error;

    fn try_from(value: String) -> anyhow::Result<Self> {
        value.as_str().try_into()
    }
}
