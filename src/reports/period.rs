//! Standard reporting periods and period-return compounding

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::returns::{compound, ReturnSeries};

/// Named reporting window anchored at an as-of date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Mtd,          // Month-to-date
    OneMonth,     // Trailing calendar month
    Qtd,          // Quarter-to-date
    ThreeMonths,  // Trailing 3 calendar months
    SixMonths,    // Trailing 6 calendar months
    Ytd,          // Year-to-date
    TwelveMonths, // Trailing 12 calendar months
}

impl Period {
    /// Every period, in reporting order
    pub const ALL: [Period; 7] = [
        Period::Mtd,
        Period::OneMonth,
        Period::Qtd,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::Ytd,
        Period::TwelveMonths,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::Mtd => "MTD",
            Period::OneMonth => "1m",
            Period::Qtd => "QTD",
            Period::ThreeMonths => "3m",
            Period::SixMonths => "6m",
            Period::Ytd => "YTD",
            Period::TwelveMonths => "12m",
        }
    }

    /// First day of the window ending at `end`
    pub fn start_date(&self, end: NaiveDate) -> NaiveDate {
        match self {
            Period::Mtd => end.with_day(1).unwrap_or(end),
            Period::Qtd => {
                let quarter_start_month = ((end.month() - 1) / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(end.year(), quarter_start_month, 1).unwrap_or(end)
            }
            Period::Ytd => NaiveDate::from_ymd_opt(end.year(), 1, 1).unwrap_or(end),
            Period::OneMonth => months_back(end, 1),
            Period::ThreeMonths => months_back(end, 3),
            Period::SixMonths => months_back(end, 6),
            Period::TwelveMonths => months_back(end, 12),
        }
    }

    /// Inclusive `[start, end]` window for an as-of date
    pub fn window(&self, end: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.start_date(end), end)
    }
}

// Month-end clamps: Mar 31 minus one month is the last day of February
fn months_back(end: NaiveDate, months: u32) -> NaiveDate {
    end.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MTD" => Ok(Period::Mtd),
            "1M" => Ok(Period::OneMonth),
            "QTD" => Ok(Period::Qtd),
            "3M" => Ok(Period::ThreeMonths),
            "6M" => Ok(Period::SixMonths),
            "YTD" => Ok(Period::Ytd),
            "12M" | "1Y" => Ok(Period::TwelveMonths),
            _ => Err(EngineError::UnknownPeriod(s.to_string())),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.label().to_string()
    }
}

/// Parse a list of period labels, failing on the first unknown one
pub fn parse_periods<S: AsRef<str>>(labels: &[S]) -> Result<Vec<Period>, EngineError> {
    labels.iter().map(|l| l.as_ref().parse()).collect()
}

/// As-of boundary for period windows: a calendar date, or an instant in
/// some timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsOf {
    Date(NaiveDate),
    Zoned(DateTime<FixedOffset>),
}

impl AsOf {
    /// Calendar date of this boundary on a date index recorded in `tz`.
    ///
    /// A zoned instant is converted into the index's timezone; against a
    /// naive index its offset is dropped and the local date is kept.
    pub fn localize(&self, tz: Option<FixedOffset>) -> NaiveDate {
        match (self, tz) {
            (AsOf::Date(date), _) => *date,
            (AsOf::Zoned(instant), Some(tz)) => instant.with_timezone(&tz).date_naive(),
            (AsOf::Zoned(instant), None) => instant.naive_local().date(),
        }
    }
}

impl From<NaiveDate> for AsOf {
    fn from(date: NaiveDate) -> Self {
        AsOf::Date(date)
    }
}

impl From<DateTime<FixedOffset>> for AsOf {
    fn from(instant: DateTime<FixedOffset>) -> Self {
        AsOf::Zoned(instant)
    }
}

/// Compounded return of `series` over `period`.
///
/// `as_of` defaults to the series' latest date. An empty window (or empty
/// series) yields zero.
pub fn calculate_period_return(series: &ReturnSeries, period: Period, as_of: Option<AsOf>) -> Decimal {
    let end = match as_of {
        Some(boundary) => boundary.localize(series.tz),
        None => match series.last_date() {
            Some(date) => date,
            None => return Decimal::ZERO,
        },
    };
    let (start, end) = period.window(end);
    compound(series.window(start, end))
}
