use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::period::{calculate_period_return, AsOf, Period};
use crate::returns::ReturnSeries;

/// Compounded period returns keyed by series name (baskets and benchmarks)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub as_of: Option<NaiveDate>,
    pub periods: Vec<Period>,
    pub rows: BTreeMap<String, BTreeMap<Period, Decimal>>,
}

impl PerformanceSummary {
    pub fn get(&self, name: &str, period: Period) -> Option<Decimal> {
        self.rows.get(name).and_then(|row| row.get(&period)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rows.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Latest date across a set of series
pub fn latest_date<'a, I>(series: I) -> Option<NaiveDate>
where
    I: IntoIterator<Item = &'a ReturnSeries>,
{
    series.into_iter().filter_map(|s| s.last_date()).max()
}

/// Period returns for every series at a common as-of boundary.
///
/// Without an explicit `as_of` the latest date across all series is used, so
/// a stale series reports zero for windows it has no data in rather than
/// being measured against its own last date.
pub fn performance_summary(
    series: &[ReturnSeries],
    periods: &[Period],
    as_of: Option<AsOf>,
) -> PerformanceSummary {
    let boundary = as_of.or_else(|| latest_date(series).map(AsOf::Date));

    let rows = series
        .iter()
        .map(|s| {
            let returns = periods
                .iter()
                .map(|p| {
                    let value = match boundary {
                        Some(b) => calculate_period_return(s, *p, Some(b)),
                        None => Decimal::ZERO,
                    };
                    (*p, value)
                })
                .collect();
            (s.name.clone(), returns)
        })
        .collect();

    PerformanceSummary {
        as_of: boundary.map(|b| b.localize(None)),
        periods: periods.to_vec(),
        rows,
    }
}
