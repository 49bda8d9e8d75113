use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::performance::PerformanceSummary;
use super::period::Period;
use crate::error::{EngineError, Result};
use crate::returns::clamped_add;
use crate::store::BenchmarkMap;

/// Basket return minus benchmark return, per period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativeRow {
    pub basket: String,
    pub benchmark: String,
    pub excess: BTreeMap<Period, Decimal>,
}

fn relative_row(summary: &PerformanceSummary, basket: &str, benchmark: &str) -> Option<RelativeRow> {
    let basket_returns = summary.rows.get(basket)?;
    let benchmark_returns = summary.rows.get(benchmark)?;

    let mut clamped = false;
    let excess = summary
        .periods
        .iter()
        .filter_map(|p| {
            let b = basket_returns.get(p)?;
            let m = benchmark_returns.get(p)?;
            Some((*p, clamped_add(*b, -*m, &mut clamped)))
        })
        .collect();
    if clamped {
        warn!("{} vs {}: excess return exceeded the decimal range and was clamped", basket, benchmark);
    }

    Some(RelativeRow {
        basket: basket.to_string(),
        benchmark: benchmark.to_string(),
        excess,
    })
}

/// Relative rows for every basket whose benchmark has summary data.
///
/// Baskets without a mapping, or whose benchmark is absent from the
/// summary, are skipped. Benchmark rows themselves are never treated as
/// baskets.
pub fn relative_performance(summary: &PerformanceSummary, mapping: &BenchmarkMap) -> Vec<RelativeRow> {
    summary
        .rows
        .keys()
        .filter_map(|basket| {
            let benchmark = mapping.get(basket)?;
            let row = relative_row(summary, basket, benchmark);
            if row.is_none() {
                debug!("Skipping {}: benchmark {} not in summary", basket, benchmark);
            }
            row
        })
        .collect()
}

/// Relative row for one explicitly requested basket; a missing mapping or
/// missing benchmark data is an error.
pub fn relative_performance_for(
    summary: &PerformanceSummary,
    mapping: &BenchmarkMap,
    basket: &str,
) -> Result<RelativeRow> {
    if !summary.contains(basket) {
        return Err(EngineError::UnknownBasket(basket.to_string()).into());
    }
    let benchmark = mapping
        .get(basket)
        .ok_or_else(|| EngineError::MissingBenchmark(basket.to_string()))?;

    relative_row(summary, basket, benchmark).ok_or_else(|| {
        EngineError::BenchmarkNotInSummary {
            basket: basket.to_string(),
            benchmark: benchmark.clone(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn summary() -> PerformanceSummary {
        let mut rows = BTreeMap::new();
        rows.insert(
            "Growth".to_string(),
            BTreeMap::from([(Period::Ytd, dec!(0.08)), (Period::Mtd, dec!(0.01))]),
        );
        rows.insert(
            "Value".to_string(),
            BTreeMap::from([(Period::Ytd, dec!(-0.02)), (Period::Mtd, dec!(0.00))]),
        );
        rows.insert(
            "SPY".to_string(),
            BTreeMap::from([(Period::Ytd, dec!(0.05)), (Period::Mtd, dec!(0.015))]),
        );
        PerformanceSummary {
            as_of: None,
            periods: vec![Period::Mtd, Period::Ytd],
            rows,
        }
    }

    #[test]
    fn test_relative_row_is_column_wise_difference() {
        let mapping = BenchmarkMap::from([("Growth".to_string(), "SPY".to_string())]);
        let rows = relative_performance(&summary(), &mapping);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].basket, "Growth");
        assert_eq!(rows[0].benchmark, "SPY");
        assert_eq!(rows[0].excess[&Period::Ytd], dec!(0.03));
        assert_eq!(rows[0].excess[&Period::Mtd], dec!(-0.005));
    }

    #[test]
    fn test_unmapped_and_absent_benchmarks_are_skipped() {
        let mapping = BenchmarkMap::from([
            ("Growth".to_string(), "SPY".to_string()),
            ("Value".to_string(), "IWD".to_string()),
        ]);
        let rows = relative_performance(&summary(), &mapping);
        assert_eq!(rows.iter().map(|r| r.basket.as_str()).collect::<Vec<_>>(), vec!["Growth"]);
    }

    #[test]
    fn test_explicit_request_surfaces_errors() {
        let mapping = BenchmarkMap::from([("Value".to_string(), "IWD".to_string())]);
        let s = summary();

        let err = relative_performance_for(&s, &mapping, "Growth").unwrap_err();
        assert!(matches!(err.downcast_ref::<EngineError>(), Some(EngineError::MissingBenchmark(_))));

        let err = relative_performance_for(&s, &mapping, "Value").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::BenchmarkNotInSummary { .. })
        ));

        let err = relative_performance_for(&s, &mapping, "Nope").unwrap_err();
        assert!(matches!(err.downcast_ref::<EngineError>(), Some(EngineError::UnknownBasket(_))));
    }

    #[test]
    fn test_explicit_request_success() {
        let mapping = BenchmarkMap::from([("Value".to_string(), "SPY".to_string())]);
        let row = relative_performance_for(&summary(), &mapping, "Value").unwrap();
        assert_eq!(row.excess[&Period::Ytd], dec!(-0.07));
    }
}
