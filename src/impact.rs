use std::collections::BTreeSet;

use log::debug;

use crate::error::AnalysisError;
use crate::models::{Announcement, EventImpactRecord, VolatilitySeries};
use crate::stats;

pub const DEFAULT_PRE_WINDOW: usize = 5;
pub const DEFAULT_POST_WINDOW: usize = 5;

/// Measures the volatility shift around each announcement.
///
/// For every event that lands on a trading date of `volatility`, the
/// `pre_window` values strictly before it and the `post_window` values from
/// the event onward are regressed on a 0/1 event indicator. Events off the
/// index, or without any pre-event history, are skipped. Records come back in
/// chronological order with one record per distinct date.
pub fn analyze(
    volatility: &VolatilitySeries,
    events: &[Announcement],
    pre_window: usize,
    post_window: usize,
) -> Result<Vec<EventImpactRecord>, AnalysisError> {
    if volatility.is_empty() {
        return Err(AnalysisError::invalid("volatility series is empty"));
    }
    if pre_window == 0 || post_window == 0 {
        return Err(AnalysisError::invalid(format!(
            "event windows must be positive (pre {pre_window}, post {post_window})"
        )));
    }

    let mut positions = BTreeSet::new();
    for event in events {
        match volatility.position(event.date) {
            Some(idx) => {
                positions.insert(idx);
            }
            None => debug!(
                "{}: skipping {} ({}), not a trading date in the series",
                volatility.symbol, event.date, event.description
            ),
        }
    }

    let values = volatility.values();
    let mut records = Vec::with_capacity(positions.len());

    for idx in positions {
        let event_date = volatility.points[idx].date;
        let pre = &values[idx.saturating_sub(pre_window)..idx];
        let post = &values[idx..(idx + post_window).min(values.len())];

        match estimate(pre, post) {
            Some(estimate) => records.push(EventImpactRecord {
                event_date,
                pre_event_volatility: estimate.pre_mean,
                post_event_volatility: estimate.post_mean,
                volatility_change: estimate.post_mean - estimate.pre_mean,
                impact_coefficient: estimate.slope,
                r_squared: estimate.r_squared,
            }),
            None => debug!(
                "{}: skipping {event_date}, {} pre and {} post observations cannot be fit",
                volatility.symbol,
                pre.len(),
                post.len()
            ),
        }
    }

    Ok(records)
}

struct Estimate {
    pre_mean: f64,
    post_mean: f64,
    slope: f64,
    r_squared: f64,
}

fn estimate(pre: &[f64], post: &[f64]) -> Option<Estimate> {
    let pre_mean = stats::mean(pre)?;
    let post_mean = stats::mean(post)?;

    let indicator: Vec<f64> = std::iter::repeat(0.0)
        .take(pre.len())
        .chain(std::iter::repeat(1.0).take(post.len()))
        .collect();
    let observed: Vec<f64> = pre.iter().chain(post).copied().collect();
    let fit = stats::fit_line(&indicator, &observed)?;

    Some(Estimate {
        pre_mean,
        post_mean,
        slope: fit.slope,
        r_squared: fit.r_squared,
    })
}
