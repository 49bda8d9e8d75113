//! Per-ticker contribution to a basket's period return
//!
//! For each period the ticker's own return is compounded over the window and
//! scaled by its current weight (absolute contribution). Dividing by the sum
//! of absolute contributions gives the ticker's share (relative
//! contribution). A total below `epsilon` in magnitude sets every share to
//! zero for that period.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::period::{AsOf, Period};
use crate::returns::{build_price_table, clamped_add, clamped_mul, compound, ticker_returns};
use crate::store::{Basket, CompanyInfo};

/// Default guard for near-zero period totals
pub const DEFAULT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 10);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    pub absolute: Decimal,
    pub relative: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionRow {
    pub ticker: String,
    pub info: CompanyInfo,
    /// Weight from the ticker's most recent record
    pub weight: Decimal,
    pub periods: BTreeMap<Period, Contribution>,
}

impl ContributionRow {
    pub fn absolute(&self, period: Period) -> Option<Decimal> {
        self.periods.get(&period).map(|c| c.absolute)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionTable {
    pub basket: String,
    pub as_of: Option<NaiveDate>,
    pub periods: Vec<Period>,
    /// Sum of absolute contributions per period
    pub totals: BTreeMap<Period, Decimal>,
    pub rows: Vec<ContributionRow>,
}

impl ContributionTable {
    /// Period the rows are ordered by: YTD when requested, else the first one
    pub fn sort_period(&self) -> Option<Period> {
        if self.periods.contains(&Period::Ytd) {
            Some(Period::Ytd)
        } else {
            self.periods.first().copied()
        }
    }
}

/// Contribution breakdown for one basket.
///
/// `as_of` defaults to the basket's latest date. Rows are sorted by absolute
/// contribution for [`ContributionTable::sort_period`], largest first.
pub fn contribution_analysis(
    basket: &Basket,
    periods: &[Period],
    as_of: Option<AsOf>,
    epsilon: Decimal,
) -> ContributionTable {
    let table = build_price_table(&basket.records);
    let per_ticker = ticker_returns(&table);

    let end = as_of
        .map(|b| b.localize(basket.tz))
        .or_else(|| table.dates.last().copied());

    let mut rows: Vec<ContributionRow> = table
        .tickers
        .iter()
        .map(|ticker| {
            let (weight, info) = table
                .latest
                .get(ticker)
                .cloned()
                .unwrap_or((Decimal::ZERO, CompanyInfo::default()));
            ContributionRow {
                ticker: ticker.clone(),
                info,
                weight,
                periods: BTreeMap::new(),
            }
        })
        .collect();

    let mut totals = BTreeMap::new();
    let mut clamped = false;
    for period in periods {
        let absolutes: Vec<Decimal> = match end {
            Some(end) => {
                let (start, end) = period.window(end);
                (0..per_ticker.tickers.len())
                    .map(|col| {
                        let window_returns = per_ticker
                            .dates
                            .iter()
                            .zip(per_ticker.returns.iter())
                            .filter(|(date, _)| **date >= start && **date <= end)
                            .map(|(_, row)| row[col]);
                        clamped_mul(compound(window_returns), rows[col].weight, &mut clamped)
                    })
                    .collect()
            }
            None => vec![Decimal::ZERO; rows.len()],
        };

        let total = absolutes
            .iter()
            .fold(Decimal::ZERO, |acc, a| clamped_add(acc, *a, &mut clamped));
        let normalize = total.abs() >= epsilon;
        if !normalize {
            debug!(
                "{} {}: total {} below epsilon, relative contributions set to zero",
                basket.name, period, total
            );
        }

        for (row, absolute) in rows.iter_mut().zip(absolutes) {
            let relative = if normalize {
                absolute.checked_div(total).unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ZERO
            };
            row.periods.insert(*period, Contribution { absolute, relative });
        }
        totals.insert(*period, total);
    }

    if clamped {
        warn!("{}: contribution exceeded the decimal range and was clamped", basket.name);
    }

    let mut result = ContributionTable {
        basket: basket.name.clone(),
        as_of: end,
        periods: periods.to_vec(),
        totals,
        rows,
    };

    if let Some(sort_by) = result.sort_period() {
        result.rows.sort_by(|a, b| {
            let (a_abs, b_abs) = (a.absolute(sort_by), b.absolute(sort_by));
            b_abs.cmp(&a_abs).then_with(|| a.ticker.cmp(&b.ticker))
        });
    }

    info!(
        "Contribution table for {}: {} ticker(s), {} period(s)",
        result.basket,
        result.rows.len(),
        result.periods.len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PriceRecord;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(date: NaiveDate, ticker: &str, price: Decimal, weight: Decimal) -> PriceRecord {
        PriceRecord::new(date, ticker, price, weight)
    }

    fn basket() -> Basket {
        Basket::new(
            "Mixed",
            vec![
                rec(d(2024, 1, 2), "AAA", dec!(100), dec!(0.6)),
                rec(d(2024, 1, 2), "BBB", dec!(50), dec!(0.4)),
                rec(d(2024, 1, 3), "AAA", dec!(110), dec!(0.6)),
                rec(d(2024, 1, 3), "BBB", dec!(45), dec!(0.4)),
                rec(d(2024, 1, 4), "AAA", dec!(121), dec!(0.6)),
                rec(d(2024, 1, 4), "BBB", dec!(45), dec!(0.4)),
            ],
        )
    }

    #[test]
    fn test_absolute_and_relative_contributions() {
        let table = contribution_analysis(&basket(), &[Period::Ytd], None, DEFAULT_EPSILON);
        assert_eq!(table.as_of, Some(d(2024, 1, 4)));

        let aaa = &table.rows[0];
        assert_eq!(aaa.ticker, "AAA");
        // AAA compounds 10% twice; BBB drops 10%
        assert_eq!(aaa.periods[&Period::Ytd].absolute, dec!(0.126));
        let bbb = &table.rows[1];
        assert_eq!(bbb.periods[&Period::Ytd].absolute, dec!(-0.04));

        let total = table.totals[&Period::Ytd];
        assert_eq!(total, dec!(0.086));
        let shares: Decimal = table.rows.iter().map(|r| r.periods[&Period::Ytd].relative).sum();
        assert!((shares - Decimal::ONE).abs() < dec!(0.0000000001));
    }

    #[test]
    fn test_near_zero_total_zeroes_relative_contributions() {
        let flat = Basket::new(
            "Hedged",
            vec![
                rec(d(2024, 1, 2), "LONG", dec!(100), dec!(0.5)),
                rec(d(2024, 1, 2), "SHORT", dec!(100), dec!(0.5)),
                rec(d(2024, 1, 3), "LONG", dec!(110), dec!(0.5)),
                rec(d(2024, 1, 3), "SHORT", dec!(90), dec!(0.5)),
            ],
        );
        let table = contribution_analysis(&flat, &[Period::Mtd], None, DEFAULT_EPSILON);
        assert_eq!(table.totals[&Period::Mtd], Decimal::ZERO);
        assert!(table
            .rows
            .iter()
            .all(|r| r.periods[&Period::Mtd].relative == Decimal::ZERO));
        assert_eq!(table.rows[0].periods[&Period::Mtd].absolute, dec!(0.05));
    }

    #[test]
    fn test_uses_most_recent_weight_and_metadata() {
        let info = CompanyInfo {
            company: Some("Alpha".to_string()),
            issuer_type: Some("Corporate".to_string()),
            ..CompanyInfo::default()
        };
        let reweighted = Basket::new(
            "Reweighted",
            vec![
                rec(d(2024, 1, 2), "AAA", dec!(100), dec!(0.2)),
                rec(d(2024, 1, 3), "AAA", dec!(120), dec!(0.5)).with_info(info.clone()),
            ],
        );
        let table = contribution_analysis(&reweighted, &[Period::Ytd], None, DEFAULT_EPSILON);
        let row = &table.rows[0];
        assert_eq!(row.weight, dec!(0.5));
        assert_eq!(row.info, info);
        assert_eq!(row.periods[&Period::Ytd].absolute, dec!(0.1));
        assert_eq!(row.periods[&Period::Ytd].relative, dec!(1));
    }

    #[test]
    fn test_sorts_by_first_period_without_ytd() {
        let table = contribution_analysis(
            &basket(),
            &[Period::ThreeMonths, Period::Mtd],
            None,
            DEFAULT_EPSILON,
        );
        assert_eq!(table.sort_period(), Some(Period::ThreeMonths));
        assert_eq!(table.rows[0].ticker, "AAA");
    }

    #[test]
    fn test_sorts_descending_by_ytd_contribution() {
        let losers_first = Basket::new(
            "Order",
            vec![
                rec(d(2024, 1, 2), "AAA", dec!(10), dec!(0.5)),
                rec(d(2024, 1, 2), "ZZZ", dec!(10), dec!(0.5)),
                rec(d(2024, 1, 3), "AAA", dec!(9), dec!(0.5)),
                rec(d(2024, 1, 3), "ZZZ", dec!(12), dec!(0.5)),
            ],
        );
        let table = contribution_analysis(&losers_first, &[Period::Mtd, Period::Ytd], None, DEFAULT_EPSILON);
        let order: Vec<&str> = table.rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["ZZZ", "AAA"]);
    }

    #[test]
    fn test_empty_basket_and_empty_window() {
        let empty = contribution_analysis(&Basket::new("Empty", Vec::new()), &Period::ALL, None, DEFAULT_EPSILON);
        assert!(empty.rows.is_empty());
        assert_eq!(empty.as_of, None);

        let early = contribution_analysis(
            &basket(),
            &[Period::Ytd],
            Some(AsOf::Date(d(2023, 12, 31))),
            DEFAULT_EPSILON,
        );
        assert!(early
            .rows
            .iter()
            .all(|r| r.periods[&Period::Ytd].absolute == Decimal::ZERO));
    }

    #[test]
    fn test_default_epsilon_value() {
        assert_eq!(DEFAULT_EPSILON, dec!(0.0000000001));
    }

    #[test]
    fn test_runaway_prices_clamp_instead_of_panicking() {
        let prices = [
            dec!(0.0000001),
            dec!(1),
            dec!(10000000),
            dec!(100000000000000),
            dec!(1000000000000000000000),
            dec!(1000000000000000000000000000),
        ];
        let records = prices
            .iter()
            .enumerate()
            .map(|(i, p)| PriceRecord::new(d(2024, 1, 2 + i as u32), "HYPE", *p, dec!(1)))
            .collect();
        let table = contribution_analysis(
            &Basket::new("Runaway", records),
            &[Period::Ytd],
            None,
            DEFAULT_EPSILON,
        );

        assert_eq!(table.totals[&Period::Ytd], Decimal::MAX - Decimal::ONE);
        assert_eq!(table.rows[0].periods[&Period::Ytd].relative, Decimal::ONE);
    }
}
