//! Collapses the provider's 3-hour forecast feed into daily summaries.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::Serialize;
use std::collections::HashSet;

use crate::model::{ForecastSample, utc_offset};

/// Most days the dashboard shows.
pub const MAX_DAYS: usize = 5;

/// Local hours that count as "midday" when picking a day's representative.
const MIDDAY_HOURS: std::ops::RangeInclusive<u32> = 11..=14;

/// One synthesized day: a representative sample plus that day's range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub representative: ForecastSample,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Reduce `samples` to at most [`MAX_DAYS`] daily entries, oldest first.
///
/// Dates and hours are read in the city's local time (`utc_offset_seconds`).
/// A midday sample is preferred for each day. If that does not yield a full
/// set of days, dates still without a pick take their first sample.
pub fn aggregate_daily(samples: &[ForecastSample], utc_offset_seconds: i32) -> Vec<DailyForecast> {
    let offset = utc_offset(utc_offset_seconds);

    let mut local: Vec<(DateTime<FixedOffset>, &ForecastSample)> = samples
        .iter()
        .filter_map(|s| s.time().map(|t| (t.with_timezone(&offset), s)))
        .collect();
    local.sort_by_key(|(t, _)| *t);

    let mut picked = pick(&local, Vec::new(), |t| MIDDAY_HOURS.contains(&t.hour()));
    if picked.len() < MAX_DAYS {
        picked = pick(&local, picked, |_| true);
    }
    picked.sort_by_key(|(date, _)| *date);
    picked.truncate(MAX_DAYS);

    picked
        .into_iter()
        .map(|(date, representative)| {
            let (min, max) = day_range(&local, date);
            DailyForecast { date, representative: representative.clone(), min, max }
        })
        .collect()
}

/// Extend `picked` with the first accepted sample of each date it does not
/// cover yet, stopping at `MAX_DAYS` dates.
fn pick<'a>(
    local: &[(DateTime<FixedOffset>, &'a ForecastSample)],
    mut picked: Vec<(NaiveDate, &'a ForecastSample)>,
    accept: impl Fn(&DateTime<FixedOffset>) -> bool,
) -> Vec<(NaiveDate, &'a ForecastSample)> {
    let mut seen: HashSet<NaiveDate> = picked.iter().map(|(date, _)| *date).collect();

    for (time, sample) in local {
        if picked.len() >= MAX_DAYS {
            break;
        }
        let date = time.date_naive();
        if accept(time) && seen.insert(date) {
            picked.push((date, *sample));
        }
    }

    picked
}

fn day_range(
    local: &[(DateTime<FixedOffset>, &ForecastSample)],
    date: NaiveDate,
) -> (Option<f64>, Option<f64>) {
    local.iter().filter(|(t, _)| t.date_naive() == date).map(|(_, s)| s.temperature).fold(
        (None, None),
        |(min, max): (Option<f64>, Option<f64>), temp| {
            (
                Some(min.map_or(temp, |m| m.min(temp))),
                Some(max.map_or(temp, |m| m.max(temp))),
            )
        },
    )
}
