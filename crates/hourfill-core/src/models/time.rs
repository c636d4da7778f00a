use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HourfillError, Result};

/// Granularity of a series and of the chunk planner's step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "hourly")]
    Hour,
    #[serde(alias = "daily")]
    Day,
}

impl TimeUnit {
    /// Duration of `n` units, saturating at the largest representable span
    pub fn step(self, n: i64) -> Duration {
        self.try_step(n).unwrap_or(if n < 0 { Duration::MIN } else { Duration::MAX })
    }

    /// Duration of `n` units, `None` when it does not fit a `Duration`
    pub fn try_step(self, n: i64) -> Option<Duration> {
        match self {
            TimeUnit::Hour => Duration::try_hours(n),
            TimeUnit::Day => Duration::try_days(n),
        }
    }

    /// Whether `instant` sits exactly on a unit boundary
    pub fn is_aligned(self, instant: NaiveDateTime) -> bool {
        let on_hour = instant.minute() == 0 && instant.second() == 0 && instant.nanosecond() == 0;
        match self {
            TimeUnit::Hour => on_hour,
            TimeUnit::Day => on_hour && instant.hour() == 0,
        }
    }

    /// Fail with `InvalidArgument` unless `instant` is aligned
    pub fn ensure_aligned(self, instant: NaiveDateTime, what: &str) -> Result<()> {
        if self.is_aligned(instant) {
            Ok(())
        } else {
            Err(HourfillError::invalid_argument(format!(
                "{} {} is not aligned to a whole {}",
                what, instant, self
            )))
        }
    }

    /// Number of instants in the inclusive range `[start, end]`
    pub fn count_between(self, start: NaiveDateTime, end: NaiveDateTime) -> usize {
        if end < start {
            return 0;
        }
        let span = end - start;
        let units = match self {
            TimeUnit::Hour => span.num_hours(),
            TimeUnit::Day => span.num_days(),
        };
        units as usize + 1
    }

    /// Format an instant the way the upstream API expects it
    pub fn format(self, instant: NaiveDateTime) -> String {
        match self {
            TimeUnit::Hour => instant.format("%Y-%m-%dT%H").to_string(),
            TimeUnit::Day => instant.format("%Y-%m-%d").to_string(),
        }
    }

    /// Parse an upstream `period` value.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH` and full `YYYY-MM-DDTHH:MM:SS`.
    pub fn parse_period(s: &str) -> Result<NaiveDateTime> {
        let s = s.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(dt);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(&format!("{}:00:00", s), "%Y-%m-%dT%H:%M:%S")
        {
            return Ok(dt);
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
        Err(HourfillError::invalid_argument(format!("Unrecognised period '{}'", s)))
    }

    /// Frequency tag used by the upstream API
    pub fn frequency(self) -> &'static str {
        match self {
            TimeUnit::Hour => "hourly",
            TimeUnit::Day => "daily",
        }
    }

    /// Parse a frequency tag (`hourly`, `daily`) or unit name (`hour`, `day`)
    pub fn from_frequency(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hourly" | "hour" | "h" => Ok(TimeUnit::Hour),
            "daily" | "day" | "d" => Ok(TimeUnit::Day),
            _ => Err(HourfillError::ConfigInvalid {
                key: "frequency".to_string(),
                reason: format!("Invalid frequency: {}. Use hourly or daily", s),
            }),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Hour => write!(f, "hour"),
            TimeUnit::Day => write!(f, "day"),
        }
    }
}
