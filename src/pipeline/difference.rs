use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::pipeline::reshape::LongSeries;
use crate::types::Feed;

/// Cumulative total and day-over-day increase for one (location, date)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffPoint {
    pub total: i64,
    pub new: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffSeries {
    pub feed: Feed,
    pub points: BTreeMap<(String, NaiveDate), DiffPoint>,
}

/// Day-over-day new counts in one pass over the (location, date) ordered
/// totals. The first date of each location gets 0, and decreases caused by
/// upstream corrections are clamped to 0.
pub fn difference(series: &LongSeries) -> DiffSeries {
    let mut points = BTreeMap::new();
    let mut previous: Option<(&str, i64)> = None;

    for ((location, date), &total) in &series.totals {
        let new = match previous {
            Some((prev_location, prev_total)) if prev_location == location.as_str() => {
                total.saturating_sub(prev_total).max(0)
            }
            _ => 0,
        };
        points.insert((location.clone(), *date), DiffPoint { total, new });
        previous = Some((location.as_str(), total));
    }

    DiffSeries {
        feed: series.feed,
        points,
    }
}
