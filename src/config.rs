use chrono::NaiveDate;

use crate::error::AnalysisError;
use crate::impact::{DEFAULT_POST_WINDOW, DEFAULT_PRE_WINDOW};
use crate::models::normalize_symbol;
use crate::volatility::DEFAULT_WINDOW;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub volatility_window: usize,
    pub pre_window: usize,
    pub post_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            volatility_window: DEFAULT_WINDOW,
            pre_window: DEFAULT_PRE_WINDOW,
            post_window: DEFAULT_POST_WINDOW,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.volatility_window == 0 || self.pre_window == 0 || self.post_window == 0 {
            return Err(AnalysisError::invalid(format!(
                "window sizes must be positive (volatility {}, pre {}, post {})",
                self.volatility_window, self.pre_window, self.post_window
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolSelection {
    All,
    Symbols(Vec<String>),
}

impl SymbolSelection {
    /// Explicit symbols, normalized and de-duplicated in first-seen order.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut picked: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = normalize_symbol(symbol.as_ref());
            if !symbol.is_empty() && !picked.contains(&symbol) {
                picked.push(symbol);
            }
        }
        SymbolSelection::Symbols(picked)
    }

    /// Resolves the selection against the symbols known to the store.
    pub fn resolve(&self, known: &[String]) -> Vec<String> {
        match self {
            SymbolSelection::All => known.to_vec(),
            SymbolSelection::Symbols(symbols) => symbols.clone(),
        }
    }
}

/// What to analyze: which symbols, over which inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub selection: SymbolSelection,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub config: AnalysisConfig,
}

impl AnalysisRequest {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.start > self.end {
            return Err(AnalysisError::invalid(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        if let SymbolSelection::Symbols(symbols) = &self.selection {
            if symbols.is_empty() {
                return Err(AnalysisError::invalid("select at least one symbol"));
            }
        }
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_match_conventions() {
        let config = AnalysisConfig::default();
        assert_eq!(config.volatility_window, 20);
        assert_eq!(config.pre_window, 5);
        assert_eq!(config.post_window, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_windows_are_rejected() {
        let config = AnalysisConfig {
            pre_window: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn selection_normalizes_symbols() {
        let selection = SymbolSelection::from_symbols(["aapl", " MSFT", "AAPL", ""]);
        assert_eq!(
            selection,
            SymbolSelection::Symbols(vec!["AAPL".to_string(), "MSFT".to_string()])
        );
    }

    #[test]
    fn all_selection_uses_known_symbols() {
        let known = vec!["AAPL".to_string(), "NVDA".to_string()];
        assert_eq!(SymbolSelection::All.resolve(&known), known);
    }

    #[test]
    fn request_rejects_inverted_range_and_empty_selection() {
        let mut request = AnalysisRequest {
            selection: SymbolSelection::All,
            start: date(2024, 6, 1),
            end: date(2024, 1, 1),
            config: AnalysisConfig::default(),
        };
        assert!(request.validate().is_err());

        request.end = date(2024, 12, 31);
        assert!(request.validate().is_ok());

        request.selection = SymbolSelection::Symbols(Vec::new());
        assert!(request.validate().is_err());
    }
}
