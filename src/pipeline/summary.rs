use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::types::{DailySummary, FactRow};

/// Global new confirmed and new deaths per date, ordered by date
pub fn daily_summary(facts: &[FactRow]) -> Vec<DailySummary> {
    let mut by_date: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for row in facts {
        let sums = by_date.entry(row.date).or_default();
        sums.0 += row.new_confirmed;
        sums.1 += row.new_deaths;
    }

    by_date
        .into_iter()
        .map(|(date, (new_confirmed, new_deaths))| DailySummary {
            date,
            new_confirmed,
            new_deaths,
        })
        .collect()
}
