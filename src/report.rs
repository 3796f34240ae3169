use std::fmt::Write;
use std::io;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::AnalysisRequest;
use crate::models::{AnnouncementCalendar, SymbolAnalysis};
use crate::pipeline::BatchOutcome;

const RULE_WIDTH: usize = 80;

pub fn build_report(
    request: &AnalysisRequest,
    batch: &BatchOutcome,
    calendar: &AnnouncementCalendar,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Announcement Volatility Report");
    let _ = writeln!(
        output,
        "Generated for {} to {} (volatility window {}, event windows {}/{} days)",
        request.start,
        request.end,
        request.config.volatility_window,
        request.config.pre_window,
        request.config.post_window
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "{batch}.");

    for outcome in &batch.outcomes {
        let _ = writeln!(output);
        match &outcome.result {
            Ok(analysis) => write_symbol_section(&mut output, analysis, calendar),
            Err(err) => {
                let _ = writeln!(output, "## {}", outcome.symbol);
                let _ = writeln!(output, "Analysis failed: {err}");
            }
        }
    }

    output
}

fn write_symbol_section(
    output: &mut String,
    analysis: &SymbolAnalysis,
    calendar: &AnnouncementCalendar,
) {
    let summary = &analysis.summary;
    let _ = writeln!(output, "## {}", analysis.symbol);

    let range = (analysis.volatility.first_date(), analysis.volatility.last_date());
    if let (Some(first), Some(last)) = range {
        let _ = writeln!(output, "Data range: {first} to {last}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "### Summary Statistics");
    let _ = writeln!(output, "- Average Volatility: {:.2}%", summary.average);
    let _ = writeln!(output, "- Maximum Volatility: {:.2}%", summary.maximum);
    let _ = writeln!(output, "- Minimum Volatility: {:.2}%", summary.minimum);
    let _ = writeln!(output, "- Standard Deviation: {:.2}%", summary.std_dev);
    let _ = writeln!(output);
    let _ = writeln!(output, "### Event Impact");
    let _ = writeln!(output, "Number of announcements: {}", analysis.announcements.len());

    if analysis.announcements.is_empty() {
        let _ = writeln!(
            output,
            "No announcements found for {} in the selected date range.",
            analysis.symbol
        );
        return;
    }
    if analysis.impacts.is_empty() {
        let _ = writeln!(
            output,
            "No valid events found for analysis in the selected date range."
        );
        return;
    }

    if let (Some(change), Some(fit)) = (analysis.average_change(), analysis.average_r_squared()) {
        let _ = writeln!(output, "Average Impact on Volatility: {change:.2}%");
        let _ = writeln!(output, "Average R-squared: {fit:.3}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "```");
    let _ = writeln!(output, "{}", "-".repeat(RULE_WIDTH));

    for record in &analysis.impacts {
        let description = describe_event(calendar, analysis, record.event_date)
            .unwrap_or("No description available");
        let _ = writeln!(output, "Date: {}", record.event_date);
        let _ = writeln!(output, "Event: {description}");
        let _ = writeln!(output, "Pre-Event Volatility: {:.2}%", record.pre_event_volatility);
        let _ = writeln!(output, "Post-Event Volatility: {:.2}%", record.post_event_volatility);
        let _ = writeln!(output, "Volatility Change: {:.2}%", record.volatility_change);
        let _ = writeln!(output, "Impact Coefficient: {:.3}", record.impact_coefficient);
        let _ = writeln!(output, "R-squared: {:.3}", record.r_squared);
        let _ = writeln!(output, "{}", "-".repeat(RULE_WIDTH));
    }
    let _ = writeln!(output, "```");
}

fn describe_event<'a>(
    calendar: &'a AnnouncementCalendar,
    analysis: &'a SymbolAnalysis,
    date: NaiveDate,
) -> Option<&'a str> {
    calendar.describe(&analysis.symbol, date).or_else(|| {
        analysis
            .announcements
            .iter()
            .find(|a| a.date == date && !a.description.is_empty())
            .map(|a| a.description.as_str())
    })
}

pub fn write_impacts_csv<W: io::Write>(writer: W, batch: &BatchOutcome) -> anyhow::Result<usize> {
    #[derive(Serialize)]
    struct Row<'a> {
        #[serde(rename = "Symbol")]
        symbol: &'a str,
        #[serde(rename = "Date")]
        date: NaiveDate,
        #[serde(rename = "Pre_Event_Volatility")]
        pre: f64,
        #[serde(rename = "Post_Event_Volatility")]
        post: f64,
        #[serde(rename = "Volatility_Change")]
        change: f64,
        #[serde(rename = "Impact_Coefficient")]
        coefficient: f64,
        #[serde(rename = "R_squared")]
        r_squared: f64,
    }

    let mut out = csv::Writer::from_writer(writer);
    let mut written = 0usize;
    for analysis in batch.successes() {
        for record in &analysis.impacts {
            out.serialize(Row {
                symbol: &analysis.symbol,
                date: record.event_date,
                pre: record.pre_event_volatility,
                post: record.post_event_volatility,
                change: record.volatility_change,
                coefficient: record.impact_coefficient,
                r_squared: record.r_squared,
            })?;
            written += 1;
        }
    }
    out.flush()?;
    Ok(written)
}

pub fn write_series_csv<W: io::Write>(writer: W, batch: &BatchOutcome) -> anyhow::Result<usize> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["Symbol", "Date", "Close", "Volatility"])?;

    let mut written = 0usize;
    for analysis in batch.successes() {
        for point in &analysis.volatility.points {
            out.write_record([
                analysis.symbol.clone(),
                point.date.to_string(),
                point.close.to_string(),
                format!("{:.4}", point.volatility),
            ])?;
            written += 1;
        }
    }
    out.flush()?;
    Ok(written)
}

pub fn batch_json(request: &AnalysisRequest, batch: &BatchOutcome) -> Value {
    let symbols: Vec<Value> = batch
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(analysis) => json!({
                "symbol": outcome.symbol,
                "status": "ok",
                "summary": analysis.summary,
                "volatility": analysis.volatility.points,
                "announcements": analysis.announcements,
                "impacts": analysis.impacts,
            }),
            Err(err) => json!({
                "symbol": outcome.symbol,
                "status": "error",
                "error": err.to_string(),
            }),
        })
        .collect();

    json!({
        "start": request.start,
        "end": request.end,
        "volatility_window": request.config.volatility_window,
        "pre_window": request.config.pre_window,
        "post_window": request.config.post_window,
        "completed": batch.completed(),
        "total": batch.total(),
        "symbols": symbols,
    })
}
