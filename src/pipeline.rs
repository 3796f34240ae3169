use std::fmt;

use log::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::impact;
use crate::models::{Announcement, PriceSeries, SymbolAnalysis};
use crate::volatility;

/// Data for one symbol, or the reason it could not be loaded.
#[derive(Debug, Clone)]
pub struct SymbolInput {
    pub symbol: String,
    pub data: Result<(PriceSeries, Vec<Announcement>), AnalysisError>,
}

#[derive(Debug, Clone)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub result: Result<SymbolAnalysis, AnalysisError>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub outcomes: Vec<SymbolOutcome>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn completed(&self) -> usize {
        self.successes().count()
    }

    pub fn successes(&self) -> impl Iterator<Item = &SymbolAnalysis> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &AnalysisError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.symbol.as_str(), e)))
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} of {} analyses completed successfully",
            self.completed(),
            self.total()
        )
    }
}

pub fn analyze_symbol(
    config: &AnalysisConfig,
    prices: &PriceSeries,
    announcements: &[Announcement],
) -> Result<SymbolAnalysis, AnalysisError> {
    config.validate()?;

    let series = volatility::derive(prices, config.volatility_window)?;
    let summary = volatility::summarize(&series)
        .ok_or_else(|| AnalysisError::invalid("volatility series is empty"))?;
    let impacts = impact::analyze(&series, announcements, config.pre_window, config.post_window)?;

    Ok(SymbolAnalysis {
        symbol: prices.symbol().to_string(),
        volatility: series,
        summary,
        announcements: announcements.to_vec(),
        impacts,
    })
}

/// Runs one pipeline per symbol on the blocking pool.
///
/// Outcomes keep the order of `inputs`; a failed or panicked symbol only
/// affects its own outcome.
pub async fn analyze_batch(config: AnalysisConfig, inputs: Vec<SymbolInput>) -> BatchOutcome {
    let mut handles = Vec::with_capacity(inputs.len());

    for input in inputs {
        let symbol = input.symbol.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let (prices, announcements) = input.data?;
            analyze_symbol(&config, &prices, &announcements)
        });
        handles.push((symbol, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (symbol, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(err) => Err(AnalysisError::Aborted(err.to_string())),
        };

        match &result {
            Ok(analysis) => info!(
                "{symbol}: {} volatility rows, {} of {} announcements analyzed",
                analysis.volatility.len(),
                analysis.impacts.len(),
                analysis.announcements.len()
            ),
            Err(err) => warn!("{symbol}: analysis failed: {err}"),
        }

        outcomes.push(SymbolOutcome { symbol, result });
    }

    let batch = BatchOutcome { outcomes };
    info!("{batch}");
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    fn prices(symbol: &str, days: usize) -> PriceSeries {
        let bars = (0..days)
            .map(|i| {
                let close = 100.0 + ((i * 13) % 7) as f64;
                PriceBar {
                    date: start() + Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 5_000,
                }
            })
            .collect();
        PriceSeries::new(symbol, bars).unwrap()
    }

    fn launch(offset: i64) -> Announcement {
        Announcement::new(start() + Duration::days(offset), "launch")
    }

    #[test]
    fn single_symbol_pipeline_produces_records() {
        let analysis =
            analyze_symbol(&AnalysisConfig::default(), &prices("AAPL", 60), &[launch(35)]).unwrap();

        assert_eq!(analysis.symbol, "AAPL");
        assert_eq!(analysis.volatility.len(), 40);
        assert_eq!(analysis.impacts.len(), 1);
        assert!(analysis.summary.minimum >= 0.0);
    }

    #[tokio::test]
    async fn failures_stay_scoped_to_their_symbol() {
        let inputs = vec![
            SymbolInput {
                symbol: "AAPL".to_string(),
                data: Ok((prices("AAPL", 60), vec![launch(30)])),
            },
            SymbolInput {
                symbol: "MSFT".to_string(),
                data: Ok((prices("MSFT", 10), vec![launch(5)])),
            },
            SymbolInput {
                symbol: "NVDA".to_string(),
                data: Err(AnalysisError::Source("connection refused".to_string())),
            },
            SymbolInput {
                symbol: "TSLA".to_string(),
                data: Ok((prices("TSLA", 45), Vec::new())),
            },
        ];

        let batch = analyze_batch(AnalysisConfig::default(), inputs).await;

        assert_eq!(batch.total(), 4);
        assert_eq!(batch.completed(), 2);
        assert_eq!(batch.to_string(), "2 of 4 analyses completed successfully");

        let order: Vec<&str> = batch.outcomes.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(order, vec!["AAPL", "MSFT", "NVDA", "TSLA"]);

        let failed: Vec<&str> = batch.failures().map(|(symbol, _)| symbol).collect();
        assert_eq!(failed, vec!["MSFT", "NVDA"]);
        assert!(matches!(
            batch.outcomes[1].result,
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let batch = analyze_batch(AnalysisConfig::default(), Vec::new()).await;
        assert_eq!(batch.total(), 0);
        assert_eq!(batch.completed(), 0);
    }
}
