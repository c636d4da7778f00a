use crate::error::{HourfillError, Result};
use crate::models::TimeUnit;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive sub-range of a requested interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Splits a long interval into request-sized chunks
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlanner {
    /// Maximum step between boundaries, in `unit`s
    pub offset: i64,
    /// Granularity of the interval
    pub unit: TimeUnit,
}

impl ChunkPlanner {
    /// Create a planner; `offset` must be positive
    pub fn new(offset: i64, unit: TimeUnit) -> Result<Self> {
        if offset <= 0 {
            return Err(HourfillError::invalid_argument(format!(
                "offset must be a positive number of {}s, got {}",
                unit, offset
            )));
        }
        Ok(Self { offset, unit })
    }

    /// Boundary instants from `start` to `end`.
    ///
    /// The first element is `start`, the last is `end`, and every step is at
    /// most `offset` units. The final step snaps to `end` instead of
    /// overshooting it. `start == end` yields `[start]`.
    pub fn plan(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<NaiveDateTime>> {
        self.validate(start, end)?;

        // A step past the representable range always lands beyond `end`
        let step = self.unit.try_step(self.offset);
        let mut boundaries = vec![start];
        let mut current = start;

        while current < end {
            current = match step.and_then(|s| current.checked_add_signed(s)) {
                Some(next) if next < end => next,
                _ => end,
            };
            boundaries.push(current);
        }

        Ok(boundaries)
    }

    /// Non-overlapping inclusive chunks covering `[start, end]`.
    ///
    /// Every chunk but the last ends one unit before the next boundary; the
    /// last ends exactly at `end`. A single-instant range gives one chunk.
    pub fn chunks(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Chunk>> {
        let boundaries = self.plan(start, end)?;

        if boundaries.len() == 1 {
            return Ok(vec![Chunk { start, end }]);
        }

        let one = self.unit.step(1);
        let last = boundaries.len() - 2;
        let chunks = boundaries
            .windows(2)
            .enumerate()
            .map(|(i, pair)| Chunk {
                start: pair[0],
                end: if i == last { pair[1] } else { pair[1] - one },
            })
            .collect();

        Ok(chunks)
    }

    fn validate(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<()> {
        self.unit.ensure_aligned(start, "start")?;
        self.unit.ensure_aligned(end, "end")?;
        if start > end {
            return Err(HourfillError::invalid_argument(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(())
    }
}
