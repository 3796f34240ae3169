use std::io::Read;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::{AnnouncementCalendar, PriceBar};

#[derive(Deserialize)]
struct PriceRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
}

/// Reads a daily price export (`Date,Open,High,Low,Close[,Adj Close],Volume`).
///
/// Rows come back sorted by date; extra columns are ignored.
pub fn read_price_csv<R: Read>(reader: R) -> anyhow::Result<Vec<PriceBar>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for (idx, result) in reader.deserialize::<PriceRow>().enumerate() {
        let row = result.with_context(|| format!("invalid price row {}", idx + 1))?;
        bars.push(PriceBar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.round() as i64,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

pub fn read_announcement_csv<R: Read>(reader: R) -> anyhow::Result<AnnouncementCalendar> {
    #[derive(Deserialize)]
    struct CsvRow {
        symbol: String,
        date: String,
        description: String,
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        let row = result.context("invalid announcement row")?;
        rows.push((row.symbol, row.date, row.description));
    }

    Ok(AnnouncementCalendar::from_entries(rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_yahoo_export_with_adjusted_close() {
        let data = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-06-11,193.65,207.16,193.63,207.15,206.37,172373300
2024-06-10,196.90,197.30,187.43,193.12,192.39,97262100
";
        let bars = read_price_csv(data.as_bytes()).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert_eq!(bars[0].close, 193.12);
        assert_eq!(bars[1].volume, 172_373_300);
    }

    #[test]
    fn reads_export_without_adjusted_close() {
        let data = "Date,Open,High,Low,Close,Volume\n2024-06-10,1,2,0.5,1.5,100\n";
        let bars = read_price_csv(data.as_bytes()).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].high, 2.0);
    }

    #[test]
    fn malformed_price_row_is_an_error() {
        let data = "Date,Open,High,Low,Close,Volume\n2024-06-10,1,2,0.5,null,100\n";
        assert!(read_price_csv(data.as_bytes()).is_err());
    }

    #[test]
    fn reads_announcements() {
        let data = "\
symbol,date,description
AAPL,2024-06-10,WWDC 2024 keynote
nvda,2024-03-18,\"GTC 2024: Blackwell platform\"
";
        let calendar = read_announcement_csv(data.as_bytes()).unwrap();

        assert_eq!(calendar.len(), 2);
        assert_eq!(
            calendar.describe("NVDA", NaiveDate::from_ymd_opt(2024, 3, 18).unwrap()),
            Some("GTC 2024: Blackwell platform")
        );
    }

    #[test]
    fn rejects_announcement_with_bad_date() {
        let data = "symbol,date,description\nAAPL,June 10,WWDC\n";
        assert!(read_announcement_csv(data.as_bytes()).is_err());
    }
}
