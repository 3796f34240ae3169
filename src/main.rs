use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod config;
mod db;
mod error;
mod impact;
mod ingest;
mod models;
mod pipeline;
mod report;
mod stats;
mod volatility;

use config::{AnalysisConfig, AnalysisRequest, SymbolSelection};
use error::AnalysisError;
use models::{AnnouncementCalendar, PriceSeries};
use pipeline::{BatchOutcome, SymbolInput};

#[derive(Parser)]
#[command(name = "event-volatility")]
#[command(about = "Measure how product announcements move short-term stock volatility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the tracked companies and curated announcements
    Seed,
    /// Import daily prices for one symbol from a CSV export
    ImportPrices {
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import announcements from a symbol,date,description CSV
    ImportAnnouncements {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Analyze volatility around announcements and print a summary
    Analyze {
        #[command(flatten)]
        analysis: AnalysisArgs,
        /// Print the full result set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export event impacts and volatility series as CSV
    Export {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "impacts.csv")]
        impacts: PathBuf,
        #[arg(long, default_value = "volatility.csv")]
        series: PathBuf,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// Comma-separated ticker symbols
    #[arg(long, value_delimiter = ',', required_unless_present = "all", conflicts_with = "all")]
    symbols: Vec<String>,
    /// Analyze every company in the store
    #[arg(long)]
    all: bool,
    /// First date (YYYY-MM-DD), defaults to one year before --end
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Last date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Rolling volatility window in trading days
    #[arg(long, default_value_t = volatility::DEFAULT_WINDOW)]
    window: usize,
    /// Trading days before each announcement
    #[arg(long, default_value_t = impact::DEFAULT_PRE_WINDOW)]
    pre: usize,
    /// Trading days from each announcement onward
    #[arg(long, default_value_t = impact::DEFAULT_POST_WINDOW)]
    post: usize,
    /// Read announcements from this CSV instead of the store
    #[arg(long)]
    announcements: Option<PathBuf>,
}

impl AnalysisArgs {
    fn to_request(&self) -> AnalysisRequest {
        let end = self.end.unwrap_or_else(|| Utc::now().date_naive());
        let start = self.start.unwrap_or(end - Duration::days(365));
        let selection = if self.all {
            SymbolSelection::All
        } else {
            SymbolSelection::from_symbols(&self.symbols)
        };

        AnalysisRequest {
            selection,
            start,
            end,
            config: AnalysisConfig {
                volatility_window: self.window,
                pre_window: self.pre,
                post_window: self.post,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the price and announcement store")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportPrices { symbol, csv } => {
            let file = File::open(&csv).with_context(|| format!("cannot open {}", csv.display()))?;
            let bars = ingest::read_price_csv(file)?;
            let written = db::import_prices(&pool, &symbol, &bars).await?;
            println!("Stored {written} price rows for {} from {}.", symbol.trim(), csv.display());
        }
        Commands::ImportAnnouncements { csv } => {
            let file = File::open(&csv).with_context(|| format!("cannot open {}", csv.display()))?;
            let calendar = ingest::read_announcement_csv(file)?;
            let inserted = db::import_announcements(&pool, &calendar).await?;
            println!(
                "Inserted {inserted} of {} announcements from {}.",
                calendar.len(),
                csv.display()
            );
        }
        Commands::Analyze { analysis, json } => {
            let request = analysis.to_request();
            let (batch, _) = run_analysis(&pool, &request, analysis.announcements.as_deref()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report::batch_json(&request, &batch))?);
                return Ok(());
            }

            print_summary(&batch);
        }
        Commands::Report { analysis, out } => {
            let request = analysis.to_request();
            let (batch, calendar) =
                run_analysis(&pool, &request, analysis.announcements.as_deref()).await?;
            let report = report::build_report(&request, &batch, &calendar);
            std::fs::write(&out, report)?;
            println!("{batch}. Report written to {}.", out.display());
        }
        Commands::Export {
            analysis,
            impacts,
            series,
        } => {
            let request = analysis.to_request();
            let (batch, _) = run_analysis(&pool, &request, analysis.announcements.as_deref()).await?;

            let file = File::create(&impacts)
                .with_context(|| format!("cannot create {}", impacts.display()))?;
            let records = report::write_impacts_csv(file, &batch)?;
            let file = File::create(&series)
                .with_context(|| format!("cannot create {}", series.display()))?;
            let rows = report::write_series_csv(file, &batch)?;

            println!(
                "{batch}. Wrote {records} event records to {} and {rows} volatility rows to {}.",
                impacts.display(),
                series.display()
            );
        }
    }

    Ok(())
}

async fn run_analysis(
    pool: &PgPool,
    request: &AnalysisRequest,
    announcements_csv: Option<&Path>,
) -> anyhow::Result<(BatchOutcome, AnnouncementCalendar)> {
    request.validate()?;

    let curated = match announcements_csv {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
            Some(ingest::read_announcement_csv(file)?)
        }
        None => None,
    };

    let known = match request.selection {
        SymbolSelection::All => db::list_symbols(pool).await?,
        SymbolSelection::Symbols(_) => Vec::new(),
    };
    let symbols = request.selection.resolve(&known);
    info!(
        "analyzing {} symbols from {} to {}",
        symbols.len(),
        request.start,
        request.end
    );

    let mut calendar = AnnouncementCalendar::default();
    let mut inputs = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let data = load_symbol(pool, &symbol, request, curated.as_ref()).await;
        if let Ok((_, announcements)) = &data {
            for announcement in announcements {
                calendar.insert(&symbol, announcement.clone());
            }
        }
        inputs.push(SymbolInput { symbol, data });
    }

    let batch = pipeline::analyze_batch(request.config, inputs).await;
    Ok((batch, calendar))
}

async fn load_symbol(
    pool: &PgPool,
    symbol: &str,
    request: &AnalysisRequest,
    curated: Option<&AnnouncementCalendar>,
) -> Result<(PriceSeries, Vec<models::Announcement>), AnalysisError> {
    let (start, end) = (request.start, request.end);
    let bars = db::fetch_prices(pool, symbol, start, end)
        .await
        .map_err(|err| AnalysisError::Source(format!("{err:#}")))?;
    let announcements = match curated {
        Some(calendar) => calendar.for_symbol(symbol, start, end).to_vec(),
        None => db::fetch_announcements(pool, symbol, start, end)
            .await
            .map_err(|err| AnalysisError::Source(format!("{err:#}")))?,
    };

    Ok((PriceSeries::new(symbol, bars)?, announcements))
}

fn print_summary(batch: &BatchOutcome) {
    if batch.total() == 0 {
        println!("No symbols selected.");
        return;
    }

    println!("Volatility around announcements:");
    for outcome in &batch.outcomes {
        match &outcome.result {
            Ok(analysis) => {
                let change = analysis
                    .average_change()
                    .map(|c| format!("{c:+.2}%"))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "- {} avg volatility {:.2}% across {} days, {} of {} events analyzed, avg change {}",
                    analysis.symbol,
                    analysis.summary.average,
                    analysis.volatility.len(),
                    analysis.impacts.len(),
                    analysis.announcements.len(),
                    change
                );
            }
            Err(err) => println!("- {} failed: {err}", outcome.symbol),
        }
    }
    println!("{batch}.");
}
