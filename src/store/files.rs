//! CSV-backed basket source used by the command-line front end.
//!
//! Three files feed a [`MemoryStore`]:
//! - basket records: `basket,date,ticker,price,weight` plus optional
//!   `company,sector,industry,market_cap,issuer_type` columns
//! - benchmark prices: `date,ticker,price`
//! - benchmark mapping: `basket,benchmark`
//!
//! Columns are located by header name, so order does not matter. Malformed
//! rows are logged and skipped.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::models::{Basket, CompanyInfo, PriceRecord};
use super::MemoryStore;
use crate::error::EngineError;

/// Load baskets, and optionally benchmark prices and mapping, into a store
pub fn load_store(
    baskets_path: &Path,
    benchmarks_path: Option<&Path>,
    mapping_path: Option<&Path>,
) -> Result<MemoryStore> {
    let mut store = MemoryStore::new();

    for basket in parse_basket_csv(baskets_path)? {
        store.add_basket(basket);
    }

    if let Some(path) = benchmarks_path {
        for benchmark in parse_benchmark_csv(path)? {
            if let Some(tz) = benchmark.tz {
                store.set_benchmark_tz(&benchmark.name, tz);
            }
            store.add_benchmark_records(&benchmark.name, benchmark.records);
        }
    }

    if let Some(path) = mapping_path {
        for (basket, ticker) in parse_mapping_csv(path)? {
            store.map_benchmark(&basket, &ticker);
        }
    }

    info!("Loaded {} basket(s)", store.basket_count());
    Ok(store)
}

#[derive(Debug)]
struct BasketColumns {
    basket: usize,
    date: usize,
    ticker: usize,
    price: usize,
    weight: usize,
    company: Option<usize>,
    sector: Option<usize>,
    industry: Option<usize>,
    market_cap: Option<usize>,
    issuer_type: Option<usize>,
}

fn column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let text = h.trim().to_lowercase().replace([' ', '-'], "_");
        names.contains(&text.as_str())
    })
}

fn required(headers: &StringRecord, names: &[&str]) -> Result<usize> {
    column(headers, names).ok_or_else(|| anyhow!("{} column not found", names[0]))
}

fn find_basket_columns(headers: &StringRecord) -> Result<BasketColumns> {
    Ok(BasketColumns {
        basket: required(headers, &["basket", "basket_name", "portfolio"])?,
        date: required(headers, &["date", "timestamp", "as_of"])?,
        ticker: required(headers, &["ticker", "symbol"])?,
        price: required(headers, &["price", "close", "close_price"])?,
        weight: required(headers, &["weight"])?,
        company: column(headers, &["company", "name", "company_name"]),
        sector: column(headers, &["sector"]),
        industry: column(headers, &["industry"]),
        market_cap: column(headers, &["market_cap", "marketcap"]),
        issuer_type: column(headers, &["issuer_type", "issuer"]),
    })
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {:?}", path))
}

/// Parse basket records, grouped by basket name in file order
pub fn parse_basket_csv(path: &Path) -> Result<Vec<Basket>> {
    info!("Parsing basket CSV file: {:?}", path);
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let columns = find_basket_columns(&headers)?;
    debug!("Column mapping: {:?}", columns);

    let mut baskets: BTreeMap<String, Basket> = BTreeMap::new();

    for (idx, result) in reader.records().enumerate() {
        let record = result.context("Failed to read CSV record")?;
        let row_num = idx + 2;

        match parse_basket_row(&record, &columns, row_num) {
            Ok(Some((name, tz, price_record))) => {
                let basket = baskets.entry(name.clone()).or_insert_with(|| match tz {
                    Some(offset) => Basket::new(&name, Vec::new()).with_tz(offset),
                    None => Basket::new(&name, Vec::new()),
                });
                // The first row that carries an offset sets it
                if basket.tz.is_none() {
                    basket.tz = tz;
                }
                basket.records.push(price_record);
            }
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping row {}: {}", row_num, e);
                continue;
            }
        }
    }

    Ok(baskets.into_values().collect())
}

type BasketRow = (String, Option<FixedOffset>, PriceRecord);

fn parse_basket_row(
    record: &StringRecord,
    columns: &BasketColumns,
    row_num: usize,
) -> Result<Option<BasketRow>> {
    let field = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");
    let optional = |idx: Option<usize>| {
        idx.map(field)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    };

    let basket = field(columns.basket);
    let ticker = field(columns.ticker).to_uppercase();
    if basket.is_empty() || ticker.is_empty() {
        return Ok(None);
    }

    let (date, tz) = parse_record_date(field(columns.date))
        .with_context(|| format!("bad date at row {}", row_num))?;
    let price = parse_optional_decimal(field(columns.price))
        .with_context(|| format!("bad price at row {}", row_num))?;
    let weight = parse_optional_decimal(field(columns.weight))
        .with_context(|| format!("bad weight at row {}", row_num))?
        .ok_or_else(|| anyhow!("Missing weight at row {}", row_num))?;

    let info = CompanyInfo {
        company: optional(columns.company),
        sector: optional(columns.sector),
        industry: optional(columns.industry),
        market_cap: columns
            .market_cap
            .map(field)
            .and_then(|s| parse_optional_decimal(s).ok().flatten()),
        issuer_type: optional(columns.issuer_type),
    };

    Ok(Some((
        basket.to_string(),
        tz,
        PriceRecord {
            date,
            ticker,
            price,
            weight,
            info,
        },
    )))
}

/// Parse benchmark prices into one single-ticker basket per benchmark,
/// named after the ticker. Weight is fixed at 1.
pub fn parse_benchmark_csv(path: &Path) -> Result<Vec<Basket>> {
    info!("Parsing benchmark CSV file: {:?}", path);
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let date_idx = required(&headers, &["date", "timestamp", "as_of"])?;
    let ticker_idx = required(&headers, &["ticker", "symbol", "benchmark"])?;
    let price_idx = required(&headers, &["price", "close", "close_price"])?;

    let mut series: BTreeMap<String, Basket> = BTreeMap::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.context("Failed to read CSV record")?;
        let row_num = idx + 2;
        let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");

        let ticker = field(ticker_idx).to_uppercase();
        if ticker.is_empty() {
            continue;
        }
        let parsed = parse_record_date(field(date_idx)).and_then(|(date, tz)| {
            parse_optional_decimal(field(price_idx)).map(|price| (date, tz, price))
        });
        match parsed {
            Ok((date, tz, price)) => {
                let benchmark = series
                    .entry(ticker.clone())
                    .or_insert_with(|| Basket::new(&ticker, Vec::new()));
                if benchmark.tz.is_none() {
                    benchmark.tz = tz;
                }
                benchmark.records.push(PriceRecord {
                    date,
                    ticker,
                    price,
                    weight: Decimal::ONE,
                    info: CompanyInfo::default(),
                });
            }
            Err(e) => warn!("Skipping benchmark row {}: {}", row_num, e),
        }
    }

    Ok(series.into_values().collect())
}

/// Parse the basket -> benchmark mapping. Later rows override earlier ones.
pub fn parse_mapping_csv(path: &Path) -> Result<Vec<(String, String)>> {
    info!("Parsing benchmark mapping file: {:?}", path);
    let mut reader = open_reader(path)?;
    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let basket_idx = required(&headers, &["basket", "basket_name", "portfolio"])?;
    let benchmark_idx = required(&headers, &["benchmark", "ticker", "index"])?;

    let mut pairs = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let basket = record.get(basket_idx).map(str::trim).unwrap_or("");
        let benchmark = record.get(benchmark_idx).map(str::trim).unwrap_or("");
        if basket.is_empty() || benchmark.is_empty() {
            continue;
        }
        pairs.push((basket.to_string(), benchmark.to_uppercase()));
    }
    Ok(pairs)
}

/// Accepts plain dates, naive timestamps, and RFC 3339 timestamps. Only the
/// RFC 3339 form yields an offset.
fn parse_record_date(text: &str) -> Result<(NaiveDate, Option<FixedOffset>)> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok((date, None));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok((ts.date_naive(), Some(*ts.offset())));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok((ts.date(), None));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
        return Ok((date, None));
    }

    Err(EngineError::Parse(format!("could not parse date: {}", text)).into())
}

fn parse_optional_decimal(text: &str) -> Result<Option<Decimal>> {
    let cleaned = text.replace(['$', ','], "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .map(Some)
        .map_err(|_| EngineError::Parse(format!("invalid number: {}", text)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_optional_decimal() {
        assert_eq!(parse_optional_decimal("1,234.56").unwrap(), Some(dec!(1234.56)));
        assert_eq!(parse_optional_decimal("$10.50").unwrap(), Some(dec!(10.50)));
        assert_eq!(parse_optional_decimal("").unwrap(), None);
        assert_eq!(parse_optional_decimal("NaN").unwrap(), None);
        let err = parse_optional_decimal("abc").unwrap_err();
        assert!(matches!(err.downcast_ref::<EngineError>(), Some(EngineError::Parse(_))));
    }

    #[test]
    fn test_parse_record_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(parse_record_date("2025-03-15").unwrap(), (expected, None));
        assert_eq!(parse_record_date("03/15/2025").unwrap(), (expected, None));

        let (date, tz) = parse_record_date("2025-03-15T16:00:00-05:00").unwrap();
        assert_eq!(date, expected);
        assert_eq!(tz, FixedOffset::west_opt(5 * 3600));

        let err = parse_record_date("yesterday").unwrap_err();
        assert!(matches!(err.downcast_ref::<EngineError>(), Some(EngineError::Parse(_))));
    }

    #[test]
    fn test_parse_basket_csv_groups_and_skips_bad_rows() {
        let file = write_csv(
            "Basket,Date,Ticker,Price,Weight,Sector\n\
             Tech,2024-01-02,aapl,185.0,0.6,Technology\n\
             Tech,2024-01-02,MSFT,370.0,0.4,Technology\n\
             Tech,not-a-date,MSFT,371.0,0.4,Technology\n\
             Energy,2024-01-02,XOM,100,1,\n",
        );

        let baskets = parse_basket_csv(file.path()).unwrap();
        assert_eq!(baskets.len(), 2);

        let tech = baskets.iter().find(|b| b.name == "Tech").unwrap();
        assert_eq!(tech.records.len(), 2);
        assert_eq!(tech.records[0].ticker, "AAPL");
        assert_eq!(tech.records[0].info.sector.as_deref(), Some("Technology"));

        let energy = baskets.iter().find(|b| b.name == "Energy").unwrap();
        assert_eq!(energy.records[0].info.sector, None);
    }

    #[test]
    fn test_missing_required_column_is_an_error() {
        let file = write_csv("Basket,Date,Ticker,Price\nTech,2024-01-02,AAPL,185\n");
        let err = parse_basket_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("weight"));
    }

    #[test]
    fn test_load_store_with_benchmarks_and_mapping() {
        use crate::store::BasketStore;

        let baskets = write_csv("basket,date,ticker,price,weight\nTech,2024-01-02,AAPL,185,1\n");
        let benchmarks = write_csv("date,ticker,price\n2024-01-02,qqq,400\n2024-01-03,QQQ,404\n");
        let mapping = write_csv("basket,benchmark\nTech,qqq\n");

        let store = load_store(baskets.path(), Some(benchmarks.path()), Some(mapping.path())).unwrap();
        assert_eq!(store.benchmark_map().get("Tech"), Some(&"QQQ".to_string()));
        let records = store.benchmark_records("QQQ").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.weight == Decimal::ONE));
    }

    #[test]
    fn test_zoned_rows_carry_their_offset() {
        use crate::store::BasketStore;

        let baskets = write_csv(
            "basket,date,ticker,price,weight\n\
             Tech,2024-01-02T16:00:00-05:00,AAPL,185,1\n\
             Tech,2024-01-03T16:00:00-05:00,AAPL,186,1\n",
        );
        let benchmarks = write_csv(
            "date,ticker,price\n\
             2024-01-02T16:00:00-05:00,QQQ,400\n\
             2024-01-03T16:00:00-05:00,QQQ,404\n\
             2024-01-03,SPY,470\n",
        );

        let store = load_store(baskets.path(), Some(benchmarks.path()), None).unwrap();
        let est = FixedOffset::west_opt(5 * 3600);
        assert_eq!(store.basket("Tech").unwrap().tz, est);
        assert_eq!(store.benchmark_tz("QQQ"), est);
        assert_eq!(store.benchmark_tz("SPY"), None);
    }
}
