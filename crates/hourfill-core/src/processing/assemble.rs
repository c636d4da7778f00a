use crate::models::{DatasetRow, Observation, SeriesId, TimeUnit};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// A series laid onto its complete expected timeline
#[derive(Debug, Clone)]
pub struct AssembledSeries {
    pub series: SeriesId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub unit: TimeUnit,
    /// One row per expected timestamp, in order
    pub rows: Vec<DatasetRow>,
    /// Fetched observations dropped because they fell outside the timeline
    /// or repeated an already-filled timestamp
    pub discarded: usize,
}

impl AssembledSeries {
    pub fn missing(&self) -> usize {
        self.rows.iter().filter(|r| r.is_missing()).count()
    }

    pub fn observed(&self) -> usize {
        self.rows.len() - self.missing()
    }

    pub fn first_observed(&self) -> Option<NaiveDateTime> {
        self.rows.iter().find(|r| !r.is_missing()).map(|r| r.period)
    }

    pub fn last_observed(&self) -> Option<NaiveDateTime> {
        self.rows.iter().rev().find(|r| !r.is_missing()).map(|r| r.period)
    }
}

/// Every timestamp from `start` to `end` inclusive, one unit apart
pub fn expected_timeline(start: NaiveDateTime, end: NaiveDateTime, unit: TimeUnit) -> Vec<NaiveDateTime> {
    let mut timeline = Vec::with_capacity(unit.count_between(start, end));
    let step = unit.step(1);
    let mut current = start;
    while current <= end {
        timeline.push(current);
        current += step;
    }
    timeline
}

/// Left-join fetched observations onto the expected timeline.
///
/// Timestamps without an observation become rows with a missing value, so
/// the result always has exactly one row per expected timestamp.
pub fn assemble(
    series: &SeriesId,
    observations: Vec<Observation>,
    start: NaiveDateTime,
    end: NaiveDateTime,
    unit: TimeUnit,
) -> AssembledSeries {
    let mut by_period: BTreeMap<NaiveDateTime, Observation> = BTreeMap::new();
    let mut out_of_range = 0usize;
    let mut duplicates = 0usize;

    for obs in observations {
        if obs.period < start || obs.period > end || !unit.is_aligned(obs.period) {
            out_of_range += 1;
            continue;
        }
        if by_period.contains_key(&obs.period) {
            duplicates += 1;
            continue;
        }
        by_period.insert(obs.period, obs);
    }

    if out_of_range > 0 {
        tracing::warn!(
            series = %series,
            discarded = out_of_range,
            "Dropped observations outside the expected timeline {} .. {}",
            start,
            end
        );
    }
    if duplicates > 0 {
        tracing::warn!(series = %series, discarded = duplicates, "Dropped repeated observations");
    }

    let rows = expected_timeline(start, end, unit)
        .into_iter()
        .map(|period| match by_period.remove(&period) {
            Some(obs) => DatasetRow {
                series: series.clone(),
                period,
                value: obs.value,
                units: obs.units,
            },
            None => DatasetRow {
                series: series.clone(),
                period,
                value: None,
                units: None,
            },
        })
        .collect();

    AssembledSeries {
        series: series.clone(),
        start,
        end,
        unit,
        rows,
        discarded: out_of_range + duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn obs(h: u32, value: f64) -> Observation {
        Observation {
            period: hour(h),
            value: Some(value),
            units: Some("megawatthours".to_string()),
        }
    }

    fn series() -> SeriesId {
        SeriesId::new([("parent", "CISO"), ("subba", "PGAE")])
    }

    #[test]
    fn test_timeline_is_inclusive() {
        let timeline = expected_timeline(hour(0), hour(5), TimeUnit::Hour);
        assert_eq!(timeline.len(), 6);
        assert_eq!(timeline[0], hour(0));
        assert_eq!(timeline[5], hour(5));
    }

    #[test]
    fn test_gaps_become_missing_rows() {
        let fetched = vec![obs(0, 1.0), obs(1, 2.0), obs(4, 5.0), obs(5, 6.0)];
        let assembled = assemble(&series(), fetched, hour(0), hour(5), TimeUnit::Hour);

        assert_eq!(assembled.rows.len(), 6);
        assert_eq!(assembled.missing(), 2);
        assert!(assembled.rows[2].is_missing());
        assert!(assembled.rows[3].is_missing());
        assert_eq!(assembled.rows[4].value, Some(5.0));
        assert_eq!(assembled.discarded, 0);
    }

    #[test]
    fn test_empty_fetch_is_all_missing() {
        let assembled = assemble(&series(), Vec::new(), hour(0), hour(5), TimeUnit::Hour);
        assert_eq!(assembled.rows.len(), 6);
        assert_eq!(assembled.missing(), 6);
        assert_eq!(assembled.first_observed(), None);
    }

    #[test]
    fn test_out_of_range_rows_are_discarded() {
        let fetched = vec![obs(0, 1.0), obs(9, 9.0)];
        let assembled = assemble(&series(), fetched, hour(0), hour(2), TimeUnit::Hour);
        assert_eq!(assembled.rows.len(), 3);
        assert_eq!(assembled.discarded, 1);
    }

    #[test]
    fn test_duplicate_timestamps_keep_first() {
        let fetched = vec![obs(1, 1.0), obs(1, 7.0)];
        let assembled = assemble(&series(), fetched, hour(0), hour(2), TimeUnit::Hour);
        assert_eq!(assembled.rows[1].value, Some(1.0));
        assert_eq!(assembled.discarded, 1);
    }

    #[test]
    fn test_observed_bounds() {
        let fetched = vec![obs(2, 1.0), obs(3, 2.0)];
        let assembled = assemble(&series(), fetched, hour(0), hour(5), TimeUnit::Hour);
        assert_eq!(assembled.first_observed(), Some(hour(2)));
        assert_eq!(assembled.last_observed(), Some(hour(3)));
        assert_eq!(assembled.observed(), 2);
    }
}
