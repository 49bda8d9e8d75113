//! Series transforms: alignment, date restriction, cumulative and rebased views

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

use super::{clamped_mul, grow, ReturnSeries};

/// Several return series on a shared date index.
///
/// A cell is `None` when its series has no observation on that date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedReturns {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<Decimal>>>,
}

impl AlignedReturns {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Values of one column, in date order
    pub fn column(&self, name: &str) -> Option<Vec<Option<Decimal>>> {
        let col = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[col]).collect())
    }
}

/// Options for [`transform`]. `rebase` wins over `cumulative` when both are set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOptions {
    pub rebase: Option<Decimal>,
    pub cumulative: bool,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TransformOptions {
    pub fn rebased(base_value: Decimal) -> Self {
        Self {
            rebase: Some(base_value),
            ..Self::default()
        }
    }

    pub fn cumulative() -> Self {
        Self {
            cumulative: true,
            ..Self::default()
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    fn base_value(&self) -> Option<Decimal> {
        match (self.rebase, self.cumulative) {
            (Some(base), _) => Some(base),
            (None, true) => Some(Decimal::ONE),
            (None, false) => None,
        }
    }
}

/// Put series on the union of their dates without filling gaps
pub fn align(series: &[&ReturnSeries]) -> AlignedReturns {
    let dates: Vec<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let rows = dates
        .iter()
        .map(|date| series.iter().map(|s| s.points.get(date).copied()).collect())
        .collect();

    AlignedReturns {
        dates,
        columns: series.iter().map(|s| s.name.clone()).collect(),
        rows,
    }
}

/// Restrict to `[start, end]` and optionally compound into a cumulative or
/// rebased curve.
///
/// When `start` is given, the first remaining row is reset to a zero return
/// in every column so compounding starts fresh at the window boundary.
/// Missing cells stay missing and do not break the running product.
pub fn transform(aligned: &AlignedReturns, options: &TransformOptions) -> AlignedReturns {
    let mut dates = Vec::new();
    let mut rows: Vec<Vec<Option<Decimal>>> = Vec::new();
    for (date, row) in aligned.dates.iter().zip(aligned.rows.iter()) {
        let after_start = options.start.map_or(true, |s| *date >= s);
        let before_end = options.end.map_or(true, |e| *date <= e);
        if after_start && before_end {
            dates.push(*date);
            rows.push(row.clone());
        }
    }

    if options.start.is_some() {
        if let Some(first) = rows.first_mut() {
            first.iter_mut().for_each(|cell| *cell = Some(Decimal::ZERO));
        }
    }

    if let Some(base) = options.base_value() {
        let mut growth = vec![Decimal::ONE; aligned.columns.len()];
        let mut clamped = false;
        for row in rows.iter_mut() {
            for (col, cell) in row.iter_mut().enumerate() {
                if let Some(r) = *cell {
                    growth[col] = grow(growth[col], r, &mut clamped);
                    *cell = Some(clamped_mul(base, growth[col], &mut clamped));
                }
            }
        }
        if clamped {
            warn!("Growth curve exceeded the decimal range and was clamped");
        }
    }

    AlignedReturns {
        dates,
        columns: aligned.columns.clone(),
        rows,
    }
}
