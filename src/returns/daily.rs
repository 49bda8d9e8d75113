//! Daily return engine
//!
//! Turns raw basket records into a daily return series:
//! 1. Keep the last record per `(date, ticker)`
//! 2. Pivot into a date x ticker table of prices and weights
//! 3. Forward-fill gaps so a ticker keeps its last known price and weight
//! 4. Simple return per ticker, zero on the first observation
//! 5. Weight-and-sum across tickers for the basket return
//!
//! Benchmarks go through the same pipeline as a single ticker at weight 1.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{clamped_add, clamped_mul, ReturnSeries};
use crate::store::{Basket, CompanyInfo, PriceRecord};

/// Date x ticker pivot of forward-filled prices and weights
#[derive(Debug, Clone)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    /// `prices[row][col]`, `None` until the ticker's first quote
    pub prices: Vec<Vec<Option<Decimal>>>,
    pub weights: Vec<Vec<Option<Decimal>>>,
    /// Metadata and weight from each ticker's most recent record
    pub latest: BTreeMap<String, (Decimal, CompanyInfo)>,
}

impl PriceTable {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Per-ticker simple returns before weighting
#[derive(Debug, Clone)]
pub struct TickerReturns {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub returns: Vec<Vec<Decimal>>,
}

impl TickerReturns {
    /// Return column for one ticker as a series
    pub fn column(&self, ticker: &str) -> Option<ReturnSeries> {
        let col = self.tickers.iter().position(|t| t == ticker)?;
        Some(ReturnSeries::from_points(
            ticker,
            self.dates
                .iter()
                .zip(self.returns.iter())
                .map(|(date, row)| (*date, row[col])),
        ))
    }
}

/// Deduplicate, pivot, and forward-fill a set of records
pub fn build_price_table(records: &[PriceRecord]) -> PriceTable {
    // Later records overwrite earlier ones for the same (date, ticker)
    let mut last: BTreeMap<(NaiveDate, &str), &PriceRecord> = BTreeMap::new();
    for record in records {
        last.insert((record.date, record.ticker.as_str()), record);
    }
    if last.len() < records.len() {
        debug!(
            "Dropped {} duplicate (date, ticker) row(s)",
            records.len() - last.len()
        );
    }

    let mut dates: Vec<NaiveDate> = last.keys().map(|(date, _)| *date).collect();
    dates.dedup();
    let mut tickers: Vec<String> = last.keys().map(|(_, t)| t.to_string()).collect();
    tickers.sort();
    tickers.dedup();

    let date_idx: BTreeMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
    let ticker_idx: BTreeMap<&str, usize> = tickers
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let mut prices = vec![vec![None; tickers.len()]; dates.len()];
    let mut weights = vec![vec![None; tickers.len()]; dates.len()];
    let mut latest = BTreeMap::new();

    // BTreeMap iteration is date-ordered, so the final insert per ticker is its latest record
    for ((date, ticker), record) in &last {
        let (row, col) = (date_idx[date], ticker_idx[ticker]);
        prices[row][col] = record.price;
        weights[row][col] = Some(record.weight);
        latest.insert(ticker.to_string(), (record.weight, record.info.clone()));
    }

    forward_fill(&mut prices);
    forward_fill(&mut weights);

    PriceTable {
        dates,
        tickers,
        prices,
        weights,
        latest,
    }
}

fn forward_fill(table: &mut [Vec<Option<Decimal>>]) {
    for row in 1..table.len() {
        for col in 0..table[row].len() {
            if table[row][col].is_none() {
                table[row][col] = table[row - 1][col];
            }
        }
    }
}

/// `curr / prev - 1`, or zero when either side is missing or zero
fn simple_return(prev: Option<Decimal>, curr: Option<Decimal>) -> Decimal {
    match (prev, curr) {
        (Some(p), Some(c)) if !p.is_zero() && !c.is_zero() => c
            .checked_div(p)
            .map(|ratio| ratio - Decimal::ONE)
            .unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// Simple return per ticker per date; the first row is all zeros
pub fn ticker_returns(table: &PriceTable) -> TickerReturns {
    let mut guarded = 0usize;
    let returns = (0..table.dates.len())
        .map(|row| {
            (0..table.tickers.len())
                .map(|col| {
                    if row == 0 {
                        return Decimal::ZERO;
                    }
                    let (prev, curr) = (table.prices[row - 1][col], table.prices[row][col]);
                    if matches!((prev, curr), (Some(p), Some(c)) if p.is_zero() || c.is_zero()) {
                        guarded += 1;
                    }
                    simple_return(prev, curr)
                })
                .collect()
        })
        .collect();

    if guarded > 0 {
        debug!("Treated {} zero-price step(s) as zero return", guarded);
    }

    TickerReturns {
        dates: table.dates.clone(),
        tickers: table.tickers.clone(),
        returns,
    }
}

/// Weighted sum of ticker returns using each date's weight snapshot
fn weighted_series(name: &str, tz: Option<FixedOffset>, table: &PriceTable) -> ReturnSeries {
    let per_ticker = ticker_returns(table);
    let mut series = ReturnSeries::new(name, tz);
    let mut clamped = false;

    for (row, date) in per_ticker.dates.iter().enumerate() {
        let total = per_ticker.returns[row]
            .iter()
            .zip(table.weights[row].iter())
            .fold(Decimal::ZERO, |acc, (r, w)| match w {
                Some(w) => {
                    let weighted = clamped_mul(*r, *w, &mut clamped);
                    clamped_add(acc, weighted, &mut clamped)
                }
                None => acc,
            });
        series.points.insert(*date, total);
    }

    if clamped {
        warn!("{}: weighted return exceeded the decimal range and was clamped", name);
    }
    series
}

/// Daily return series for a basket
pub fn basket_daily_returns(basket: &Basket) -> ReturnSeries {
    let table = build_price_table(&basket.records);
    debug!(
        "Basket {}: {} date(s) x {} ticker(s)",
        basket.name,
        table.dates.len(),
        table.tickers.len()
    );
    weighted_series(&basket.name, basket.tz, &table)
}

/// Daily return series for a benchmark ticker; record weights are ignored
pub fn benchmark_daily_returns(
    ticker: &str,
    records: &[PriceRecord],
    tz: Option<FixedOffset>,
) -> ReturnSeries {
    let single: Vec<PriceRecord> = records
        .iter()
        .filter(|r| r.ticker == ticker)
        .map(|r| PriceRecord {
            weight: Decimal::ONE,
            ..r.clone()
        })
        .collect();
    let table = build_price_table(&single);
    weighted_series(ticker, tz, &table)
}
