// Returns module - daily return engine and series transforms

pub mod daily;
pub mod transform;

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

pub use daily::{
    basket_daily_returns, benchmark_daily_returns, build_price_table, ticker_returns,
    PriceTable, TickerReturns,
};
pub use transform::{align, transform, AlignedReturns, TransformOptions};

/// Date-indexed simple fractional returns for one basket or benchmark
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    pub name: String,
    /// Timezone of the date index, if the source carried one
    #[serde(with = "crate::store::models::offset_seconds")]
    pub tz: Option<FixedOffset>,
    pub points: BTreeMap<NaiveDate, Decimal>,
}

impl ReturnSeries {
    pub fn new(name: &str, tz: Option<FixedOffset>) -> Self {
        Self {
            name: name.to_string(),
            tz,
            points: BTreeMap::new(),
        }
    }

    pub fn from_points<I>(name: &str, points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Decimal)>,
    {
        Self {
            name: name.to_string(),
            tz: None,
            points: points.into_iter().collect(),
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns inside `[start, end]`, both ends inclusive
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = Decimal> + '_ {
        let range = if start <= end {
            Some(self.points.range(start..=end))
        } else {
            None
        };
        range.into_iter().flatten().map(|(_, r)| *r)
    }
}

/// `a * b`, clamped to the decimal range on overflow. Sets `clamped` when it
/// had to clamp.
pub(crate) fn clamped_mul(a: Decimal, b: Decimal, clamped: &mut bool) -> Decimal {
    a.checked_mul(b).unwrap_or_else(|| {
        *clamped = true;
        if a.is_sign_negative() != b.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

/// `a + b`, clamped to the decimal range on overflow
pub(crate) fn clamped_add(a: Decimal, b: Decimal, clamped: &mut bool) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| {
        *clamped = true;
        if b.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

/// One compounding step: `growth * (1 + r)`
pub(crate) fn grow(growth: Decimal, r: Decimal, clamped: &mut bool) -> Decimal {
    let factor = clamped_add(Decimal::ONE, r, clamped);
    clamped_mul(growth, factor, clamped)
}

/// Compound simple returns: `product(1 + r) - 1`. Empty input yields zero.
///
/// A product beyond the decimal range is clamped to `Decimal::MAX` (or
/// `Decimal::MIN`) and logged rather than panicking.
pub fn compound<I>(returns: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    let mut clamped = false;
    let growth = returns
        .into_iter()
        .fold(Decimal::ONE, |acc, r| grow(acc, r, &mut clamped));
    if clamped {
        warn!("Compounded return exceeded the decimal range and was clamped");
    }
    clamped_add(growth, Decimal::NEGATIVE_ONE, &mut clamped)
}
