use crate::utils::error::EtlError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Most fire times [`Schedule::upcoming`] will list in one call.
pub const MAX_UPCOMING: usize = 64;

/// How often a DAG is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Schedule {
    Once,
    Hourly,
    Daily,
    Weekly,
}

impl Schedule {
    pub fn period(&self) -> Option<Duration> {
        match self {
            Schedule::Once => None,
            Schedule::Hourly => Some(Duration::hours(1)),
            Schedule::Daily => Some(Duration::days(1)),
            Schedule::Weekly => Some(Duration::weeks(1)),
        }
    }

    /// First tick of `start + k * period` strictly after `after`.
    ///
    /// If `after` is before `start` the first tick is `start` itself.
    pub fn next_fire_after(
        &self,
        start: DateTime<Utc>,
        after: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if after < start {
            return Some(start);
        }

        let period = self.period()?;
        let elapsed = after - start;
        let ticks = elapsed.num_seconds() / period.num_seconds() + 1;
        start.checked_add_signed(Duration::seconds(period.num_seconds() * ticks))
    }

    /// Up to `count` fire times after `after`, capped at [`MAX_UPCOMING`].
    pub fn upcoming(
        &self,
        start: DateTime<Utc>,
        after: DateTime<Utc>,
        count: usize,
    ) -> Vec<DateTime<Utc>> {
        let count = count.min(MAX_UPCOMING);
        let mut ticks = Vec::new();
        let mut cursor = after;
        while ticks.len() < count {
            match self.next_fire_after(start, cursor) {
                Some(next) => {
                    ticks.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        ticks
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preset = match self {
            Schedule::Once => "@once",
            Schedule::Hourly => "@hourly",
            Schedule::Daily => "@daily",
            Schedule::Weekly => "@weekly",
        };
        f.write_str(preset)
    }
}

impl FromStr for Schedule {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "@once" => Ok(Schedule::Once),
            "@hourly" => Ok(Schedule::Hourly),
            "@daily" => Ok(Schedule::Daily),
            "@weekly" => Ok(Schedule::Weekly),
            other => Err(EtlError::InvalidConfigValueError {
                field: "schedule".to_string(),
                value: other.to_string(),
                reason: "Expected one of @once, @hourly, @daily, @weekly".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Schedule {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Schedule> for String {
    fn from(schedule: Schedule) -> Self {
        schedule.to_string()
    }
}
