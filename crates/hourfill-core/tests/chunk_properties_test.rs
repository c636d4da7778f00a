//! Property tests for chunk planning and series assembly

use chrono::{Duration, NaiveDate, NaiveDateTime};
use hourfill_core::models::{Observation, SeriesId, TimeUnit};
use hourfill_core::processing::{assemble, expected_timeline, ChunkPlanner};
use proptest::prelude::*;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2018, 7, 1).unwrap().and_hms_opt(8, 0, 0).unwrap()
}

proptest! {
    #[test]
    fn plan_starts_ends_and_steps_within_offset(span in 0i64..5000, offset in 1i64..3000) {
        let start = base();
        let end = start + Duration::hours(span);
        let planner = ChunkPlanner::new(offset, TimeUnit::Hour).unwrap();
        let plan = planner.plan(start, end).unwrap();

        prop_assert_eq!(plan[0], start);
        prop_assert_eq!(*plan.last().unwrap(), end);
        for pair in plan.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            prop_assert!(pair[1] - pair[0] <= Duration::hours(offset));
        }
    }

    #[test]
    fn chunks_partition_the_range(span in 0i64..2000, offset in 1i64..500) {
        let start = base();
        let end = start + Duration::hours(span);
        let planner = ChunkPlanner::new(offset, TimeUnit::Hour).unwrap();
        let chunks = planner.chunks(start, end).unwrap();

        prop_assert_eq!(chunks[0].start, start);
        prop_assert_eq!(chunks.last().unwrap().end, end);
        for chunk in &chunks {
            prop_assert!(chunk.start <= chunk.end);
        }
        for pair in chunks.windows(2) {
            prop_assert_eq!(pair[0].end + Duration::hours(1), pair[1].start);
        }

        let covered: usize = chunks
            .iter()
            .map(|c| TimeUnit::Hour.count_between(c.start, c.end))
            .sum();
        prop_assert_eq!(covered, TimeUnit::Hour.count_between(start, end));
    }

    #[test]
    fn daily_chunks_partition_the_range(span in 0i64..1000, offset in 1i64..100) {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let end = start + Duration::days(span);
        let chunks = ChunkPlanner::new(offset, TimeUnit::Day).unwrap().chunks(start, end).unwrap();

        prop_assert_eq!(chunks[0].start, start);
        prop_assert_eq!(chunks.last().unwrap().end, end);
        for pair in chunks.windows(2) {
            prop_assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
        }
    }

    #[test]
    fn assembled_length_matches_timeline(
        span in 0i64..300,
        offset in 1i64..50,
        failed in proptest::collection::vec(any::<bool>(), 0..400),
    ) {
        let start = base();
        let end = start + Duration::hours(span);
        let chunks = ChunkPlanner::new(offset, TimeUnit::Hour).unwrap().chunks(start, end).unwrap();

        let mut fetched = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if failed.get(i).copied().unwrap_or(false) {
                continue;
            }
            for period in expected_timeline(chunk.start, chunk.end, TimeUnit::Hour) {
                fetched.push(Observation { period, value: Some(1.0), units: None });
            }
        }

        let series = SeriesId::new([("parent", "CISO")]);
        let assembled = assemble(&series, fetched, start, end, TimeUnit::Hour);
        prop_assert_eq!(assembled.rows.len(), TimeUnit::Hour.count_between(start, end));
        prop_assert_eq!(assembled.discarded, 0);
    }
}
