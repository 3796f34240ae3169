use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{normalize_symbol, Announcement, AnnouncementCalendar, PriceBar};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let companies = vec![
        ("AAPL", "Apple"),
        ("MSFT", "Microsoft"),
        ("GOOGL", "Google"),
        ("AMZN", "Amazon"),
        ("TSLA", "Tesla"),
        ("META", "Meta"),
        ("NVDA", "Nvidia"),
        ("TCEHY", "Tencent"),
        ("AVGO", "Broadcom"),
    ];

    for (symbol, name) in companies {
        upsert_company(pool, symbol, Some(name)).await?;
    }

    let announcements = vec![
        ("NVDA", "2024-03-18", "GTC 2024 keynote: Blackwell GPU platform"),
        ("GOOGL", "2024-05-14", "Google I/O 2024: Gemini across products"),
        ("MSFT", "2024-05-20", "Copilot+ PCs unveiled"),
        ("AAPL", "2024-06-10", "WWDC 2024: Apple Intelligence"),
        ("AAPL", "2024-09-09", "iPhone 16 launch event"),
        ("META", "2024-09-25", "Meta Connect 2024: Orion AR glasses"),
        ("TSLA", "2024-10-10", "We, Robot event: Cybercab reveal"),
        ("AMZN", "2024-12-03", "re:Invent 2024: Nova foundation models"),
    ];
    let calendar = AnnouncementCalendar::from_entries(announcements)?;
    import_announcements(pool, &calendar).await?;

    Ok(())
}

async fn upsert_company(pool: &PgPool, symbol: &str, name: Option<&str>) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO event_impact.companies AS c (symbol, name)
        VALUES ($1, COALESCE($2, $1))
        ON CONFLICT (symbol) DO UPDATE
        SET name = COALESCE($2, c.name)
        "#,
    )
    .bind(symbol)
    .bind(name)
    .execute(pool)
    .await
    .with_context(|| format!("failed to register company {symbol}"))?;
    Ok(())
}

pub async fn list_symbols(pool: &PgPool) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query("SELECT symbol FROM event_impact.companies ORDER BY symbol")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|row| row.get("symbol")).collect())
}

pub async fn import_prices(pool: &PgPool, symbol: &str, bars: &[PriceBar]) -> anyhow::Result<usize> {
    let symbol = normalize_symbol(symbol);
    upsert_company(pool, &symbol, None).await?;

    let mut written = 0usize;
    for bar in bars {
        let result = sqlx::query(
            r#"
            INSERT INTO event_impact.daily_prices
            (id, symbol, trade_date, open, high, low, close, volume)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (symbol, trade_date) DO UPDATE
            SET open = EXCLUDED.open, high = EXCLUDED.high, low = EXCLUDED.low,
                close = EXCLUDED.close, volume = EXCLUDED.volume
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&symbol)
        .bind(bar.date)
        .bind(bar.open)
        .bind(bar.high)
        .bind(bar.low)
        .bind(bar.close)
        .bind(bar.volume)
        .execute(pool)
        .await?;

        written += result.rows_affected() as usize;
    }

    Ok(written)
}

pub async fn import_announcements(
    pool: &PgPool,
    calendar: &AnnouncementCalendar,
) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for symbol in calendar.symbols() {
        upsert_company(pool, symbol, None).await?;
    }

    for (symbol, announcement) in calendar.iter() {
        let result = sqlx::query(
            r#"
            INSERT INTO event_impact.announcements (id, symbol, announced_on, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (symbol, announced_on) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(symbol)
        .bind(announcement.date)
        .bind(&announcement.description)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn fetch_prices(
    pool: &PgPool,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<PriceBar>> {
    let records = sqlx::query(
        r#"
        SELECT trade_date, open, high, low, close, volume
        FROM event_impact.daily_prices
        WHERE symbol = $1 AND trade_date BETWEEN $2 AND $3
        ORDER BY trade_date
        "#,
    )
    .bind(symbol)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to load prices for {symbol}"))?;

    let mut bars = Vec::with_capacity(records.len());
    for row in records {
        bars.push(PriceBar {
            date: row.get("trade_date"),
            open: row.get("open"),
            high: row.get("high"),
            low: row.get("low"),
            close: row.get("close"),
            volume: row.get("volume"),
        });
    }

    Ok(bars)
}

pub async fn fetch_announcements(
    pool: &PgPool,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<Announcement>> {
    let records = sqlx::query(
        r#"
        SELECT announced_on, description
        FROM event_impact.announcements
        WHERE symbol = $1 AND announced_on BETWEEN $2 AND $3
        ORDER BY announced_on
        "#,
    )
    .bind(symbol)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to load announcements for {symbol}"))?;

    Ok(records
        .into_iter()
        .map(|row| Announcement::new(row.get("announced_on"), row.get::<String, _>("description")))
        .collect())
}
