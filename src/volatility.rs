use crate::error::AnalysisError;
use crate::models::{PriceSeries, VolatilityPoint, VolatilitySeries, VolatilitySummary};
use crate::stats;

pub const DEFAULT_WINDOW: usize = 20;

/// Scale from fractional returns to percent. Volatility is not annualized.
const PERCENT: f64 = 100.0;

/// Rolling volatility of daily close-to-close returns.
///
/// Each output row carries the sample standard deviation of the `window`
/// simple returns ending on that date, in percent. The first `window` input
/// dates have no full trailing window and are dropped, so a series of `L`
/// bars yields `L - window` rows.
pub fn derive(prices: &PriceSeries, window: usize) -> Result<VolatilitySeries, AnalysisError> {
    if window == 0 {
        return Err(AnalysisError::invalid("volatility window must be positive"));
    }

    let required = window + 1;
    if prices.len() < required {
        return Err(AnalysisError::InsufficientData {
            required,
            available: prices.len(),
        });
    }

    let closes = prices.closes();
    // returns[i] is the return into bar i + 1
    let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();

    let points = prices.bars()[window..]
        .iter()
        .zip(returns.windows(window))
        .map(|(bar, trailing)| VolatilityPoint {
            date: bar.date,
            close: bar.close,
            volatility: stats::sample_std_dev(trailing).unwrap_or(0.0) * PERCENT,
        })
        .collect();

    Ok(VolatilitySeries {
        symbol: prices.symbol().to_string(),
        window,
        points,
    })
}

pub fn summarize(series: &VolatilitySeries) -> Option<VolatilitySummary> {
    let values = series.values();
    let average = stats::mean(&values)?;
    let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);

    Some(VolatilitySummary {
        average,
        maximum,
        minimum,
        std_dev: stats::sample_std_dev(&values).unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 10_000,
            })
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    #[test]
    fn flat_prices_have_zero_volatility() {
        let prices = series_from_closes(&[100.0; 30]);
        let series = derive(&prices, 20).unwrap();

        assert_eq!(series.len(), 10);
        assert!(series.points.iter().all(|p| p.volatility == 0.0));
    }

    #[test]
    fn output_is_suffix_of_input() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let prices = series_from_closes(&closes);
        let series = derive(&prices, 7).unwrap();

        assert_eq!(series.len(), 40 - 7);
        for (point, bar) in series.points.iter().zip(&prices.bars()[7..]) {
            assert_eq!(point.date, bar.date);
            assert_eq!(point.close, bar.close);
            assert!(point.volatility >= 0.0);
            assert!(point.volatility.is_finite());
        }
    }

    #[test]
    fn minimum_length_yields_one_row() {
        let prices = series_from_closes(&[10.0, 11.0, 10.0, 12.0]);
        let series = derive(&prices, 3).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn computes_percent_sample_std_of_returns() {
        let prices = series_from_closes(&[100.0, 110.0, 99.0]);
        let series = derive(&prices, 2).unwrap();

        // returns +10% and -10%
        let expected = (0.02f64).sqrt() * 100.0;
        assert_eq!(series.len(), 1);
        assert!((series.points[0].volatility - expected).abs() < 1e-9);
    }

    #[test]
    fn single_return_window_is_zero() {
        let prices = series_from_closes(&[100.0, 110.0, 99.0]);
        let series = derive(&prices, 1).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.points.iter().all(|p| p.volatility == 0.0));
    }

    #[test]
    fn too_short_series_is_insufficient() {
        let prices = series_from_closes(&[100.0; 20]);
        let err = derive(&prices, 20).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                required: 21,
                available: 20
            }
        );
    }

    #[test]
    fn zero_window_is_invalid() {
        let prices = series_from_closes(&[100.0; 5]);
        assert!(matches!(derive(&prices, 0), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn summary_reports_extremes() {
        let prices = series_from_closes(&[100.0, 101.0, 99.0, 104.0, 90.0, 91.0]);
        let series = derive(&prices, 2).unwrap();
        let summary = summarize(&series).unwrap();
        let values = series.values();

        assert!(summary.minimum <= summary.average && summary.average <= summary.maximum);
        assert_eq!(summary.maximum, values.iter().copied().fold(f64::MIN, f64::max));
        assert!(summary.std_dev >= 0.0);
    }
}
