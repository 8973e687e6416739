use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::models::{DailyRecord, Quantity, SelfMetrics, SelfTriplet};

/// Trailing unweighted mean over `window_size` values, `None` until the window fills.
pub fn moving_average(series: &[f64], window_size: usize) -> Vec<Option<f64>> {
    if window_size == 0 {
        return vec![None; series.len()];
    }

    series
        .iter()
        .enumerate()
        .map(|(index, _)| {
            if index + 1 < window_size {
                return None;
            }
            let window = &series[index + 1 - window_size..=index];
            Some(window.iter().sum::<f64>() / window_size as f64)
        })
        .collect()
}

/// Returns a new vector ordered by date ascending; same-date records keep their input order.
pub fn sort_by_date(records: &[DailyRecord]) -> Vec<DailyRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.date);
    sorted
}

pub fn series(records: &[DailyRecord], quantity: Quantity) -> Vec<f64> {
    records.iter().map(|record| record.value(quantity)).collect()
}

pub fn latest_average(series: &[f64], window_size: usize) -> f64 {
    moving_average(series, window_size)
        .into_iter()
        .flatten()
        .last()
        .unwrap_or(0.0)
}

pub fn target(past: f64, multiplier: f64) -> f64 {
    (past * multiplier).round()
}

pub fn todays_entry(sorted: &[DailyRecord], today: NaiveDate) -> Option<&DailyRecord> {
    sorted.last().filter(|record| record.date == today)
}

pub fn derive_self(records: &[DailyRecord], today: NaiveDate, config: &EngineConfig) -> SelfMetrics {
    let sorted = sort_by_date(records);
    let today_record = todays_entry(&sorted, today).cloned();

    let triplet = |quantity: Quantity| {
        let past = latest_average(&series(&sorted, quantity), config.window_size);
        SelfTriplet {
            present: today_record.as_ref().map(|record| record.value(quantity)),
            past,
            future: target(past, config.target_multiplier),
        }
    };

    let score = triplet(Quantity::Score);
    let time_spent = triplet(Quantity::TimeSpent);
    let bounty = triplet(Quantity::Bounty);

    SelfMetrics {
        score,
        time_spent,
        bounty,
        baseline_ready: config.window_size > 0 && sorted.len() >= config.window_size,
        todays_entry: today_record,
    }
}
