use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AnalysisError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Daily bars for one symbol, date-ascending with unique dates.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, AnalysisError> {
        let symbol = symbol.into();

        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AnalysisError::invalid(format!(
                    "{symbol}: price dates must be strictly increasing ({} follows {})",
                    pair[1].date, pair[0].date
                )));
            }
        }

        if let Some(bar) = bars.iter().find(|b| !b.close.is_finite() || b.close <= 0.0) {
            return Err(AnalysisError::invalid(format!(
                "{symbol}: close on {} must be a positive number, got {}",
                bar.date, bar.close
            )));
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityPoint {
    pub date: NaiveDate,
    pub close: f64,
    /// Rolling standard deviation of daily returns, in percent.
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilitySeries {
    pub symbol: String,
    pub window: usize,
    pub points: Vec<VolatilityPoint>,
}

impl VolatilitySeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of `date` in the series, if it is a trading date.
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.points.binary_search_by_key(&date, |p| p.date).ok()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volatility).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub date: NaiveDate,
    pub description: String,
}

impl Announcement {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
        }
    }
}

/// Announcements per symbol, each list sorted by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnouncementCalendar {
    entries: BTreeMap<String, Vec<Announcement>>,
}

impl AnnouncementCalendar {
    /// Builds a calendar from raw `(symbol, iso date, description)` rows.
    ///
    /// Symbols are upper-cased and must be non-empty; dates must be `YYYY-MM-DD`.
    /// When a symbol has two rows for the same date the first description wins.
    pub fn from_entries<I, S, D, T>(rows: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = (S, D, T)>,
        S: AsRef<str>,
        D: AsRef<str>,
        T: AsRef<str>,
    {
        let mut calendar = Self::default();

        for (line, (symbol, date, description)) in rows.into_iter().enumerate() {
            let symbol = normalize_symbol(symbol.as_ref());
            if symbol.is_empty() {
                return Err(AnalysisError::invalid(format!(
                    "announcement {}: symbol is empty",
                    line + 1
                )));
            }

            let raw_date = date.as_ref().trim();
            let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|_| {
                AnalysisError::invalid(format!(
                    "announcement {} for {symbol}: '{raw_date}' is not a YYYY-MM-DD date",
                    line + 1
                ))
            })?;

            calendar.insert(&symbol, Announcement::new(date, description.as_ref().trim()));
        }

        Ok(calendar)
    }

    /// Adds one announcement, ignoring it if the symbol already has one on that date.
    pub fn insert(&mut self, symbol: &str, announcement: Announcement) -> bool {
        let list = self.entries.entry(normalize_symbol(symbol)).or_default();
        match list.binary_search_by_key(&announcement.date, |a| a.date) {
            Ok(_) => false,
            Err(idx) => {
                list.insert(idx, announcement);
                true
            }
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Announcements for `symbol` within `[start, end]` inclusive.
    pub fn for_symbol(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> &[Announcement] {
        let Some(list) = self.entries.get(&normalize_symbol(symbol)) else {
            return &[];
        };
        let lo = list.partition_point(|a| a.date < start);
        let hi = list.partition_point(|a| a.date <= end);
        if lo >= hi {
            &[]
        } else {
            &list[lo..hi]
        }
    }

    pub fn describe(&self, symbol: &str, date: NaiveDate) -> Option<&str> {
        let list = self.entries.get(&normalize_symbol(symbol))?;
        list.binary_search_by_key(&date, |a| a.date)
            .ok()
            .map(|idx| list[idx].description.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Announcement)> {
        self.entries
            .iter()
            .flat_map(|(symbol, list)| list.iter().map(move |a| (symbol.as_str(), a)))
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventImpactRecord {
    #[serde(rename = "Date")]
    pub event_date: NaiveDate,
    #[serde(rename = "Pre_Event_Volatility")]
    pub pre_event_volatility: f64,
    #[serde(rename = "Post_Event_Volatility")]
    pub post_event_volatility: f64,
    #[serde(rename = "Volatility_Change")]
    pub volatility_change: f64,
    #[serde(rename = "Impact_Coefficient")]
    pub impact_coefficient: f64,
    #[serde(rename = "R_squared")]
    pub r_squared: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilitySummary {
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub volatility: VolatilitySeries,
    pub summary: VolatilitySummary,
    pub announcements: Vec<Announcement>,
    pub impacts: Vec<EventImpactRecord>,
}

impl SymbolAnalysis {
    pub fn average_change(&self) -> Option<f64> {
        let changes: Vec<f64> = self.impacts.iter().map(|r| r.volatility_change).collect();
        crate::stats::mean(&changes)
    }

    pub fn average_r_squared(&self) -> Option<f64> {
        let fits: Vec<f64> = self.impacts.iter().map(|r| r.r_squared).collect();
        crate::stats::mean(&fits)
    }
}
