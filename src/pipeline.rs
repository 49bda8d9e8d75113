//! End-to-end analysis over a basket store.
//!
//! Stages run in dependency order and each result is kept immutable:
//! daily returns (baskets, then each distinct benchmark once) -> as-of
//! resolution -> performance summary -> relative performance. Contribution
//! tables are built on demand per basket.

use chrono::NaiveDate;
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::reports::{
    contribution_analysis, performance_summary, relative_performance, relative_performance_for,
    AsOf, ContributionTable, Period, PerformanceSummary, RelativeRow,
};
use crate::returns::{
    align, basket_daily_returns, benchmark_daily_returns, transform, AlignedReturns, ReturnSeries,
    TransformOptions,
};
use crate::store::{BasketStore, BenchmarkMap};

#[derive(Debug, Clone)]
pub struct Analysis {
    pub as_of: Option<NaiveDate>,
    pub basket_returns: BTreeMap<String, ReturnSeries>,
    pub benchmark_returns: BTreeMap<String, ReturnSeries>,
    pub summary: PerformanceSummary,
    pub relative: Vec<RelativeRow>,
    mapping: BenchmarkMap,
}

impl Analysis {
    /// Run every stage against `store`
    pub fn new<S: BasketStore + ?Sized>(store: &S, config: &EngineConfig) -> Self {
        let basket_returns: BTreeMap<String, ReturnSeries> = store
            .basket_names()
            .iter()
            .filter_map(|name| store.basket(name))
            .map(|basket| (basket.name.clone(), basket_daily_returns(basket)))
            .collect();

        let mapping = store.benchmark_map().clone();
        let mut benchmark_returns = BTreeMap::new();
        for ticker in mapping.values().unique() {
            match store.benchmark_records(ticker) {
                Some(records) => {
                    benchmark_returns.insert(
                        ticker.clone(),
                        benchmark_daily_returns(ticker, records, store.benchmark_tz(ticker)),
                    );
                }
                None => warn!("No price records for benchmark {}", ticker),
            }
        }

        // Benchmarks never move the default as-of; only baskets do
        let as_of = config
            .as_of
            .or_else(|| basket_returns.values().filter_map(|s| s.last_date()).max());

        let all_series: Vec<ReturnSeries> = basket_returns
            .values()
            .chain(
                benchmark_returns
                    .iter()
                    .filter(|(name, _)| !basket_returns.contains_key(*name))
                    .map(|(_, s)| s),
            )
            .cloned()
            .collect();
        let summary = performance_summary(&all_series, &config.periods, as_of.map(AsOf::Date));
        let relative = relative_performance(&summary, &mapping);

        info!(
            "Analyzed {} basket(s) and {} benchmark(s) as of {}",
            basket_returns.len(),
            benchmark_returns.len(),
            as_of.map(|d| d.to_string()).unwrap_or_else(|| "n/a".to_string())
        );

        Self {
            as_of,
            basket_returns,
            benchmark_returns,
            summary,
            relative,
            mapping,
        }
    }

    /// Look up a return series by basket or benchmark name
    pub fn series(&self, name: &str) -> Option<&ReturnSeries> {
        self.basket_returns
            .get(name)
            .or_else(|| self.benchmark_returns.get(name))
    }

    /// Aligned daily returns for the named series (all baskets and their
    /// benchmarks when `names` is empty), transformed by `options`
    pub fn returns_table(&self, names: &[String], options: &TransformOptions) -> Result<AlignedReturns> {
        let selected: Vec<&ReturnSeries> = if names.is_empty() {
            self.basket_returns
                .values()
                .chain(self.benchmark_returns.values())
                .collect()
        } else {
            names
                .iter()
                .map(|n| {
                    self.series(n)
                        .ok_or_else(|| EngineError::UnknownBasket(n.clone()).into())
                })
                .collect::<Result<_>>()?
        };
        Ok(transform(&align(&selected), options))
    }

    /// Relative row for one basket; fails when its benchmark is unavailable
    pub fn relative_for(&self, basket: &str) -> Result<RelativeRow> {
        relative_performance_for(&self.summary, &self.mapping, basket)
    }

    /// Contribution table for one basket at the analysis as-of date
    pub fn contribution<S: BasketStore + ?Sized>(
        &self,
        store: &S,
        basket: &str,
        periods: &[Period],
        config: &EngineConfig,
    ) -> Result<ContributionTable> {
        let records = store
            .basket(basket)
            .ok_or_else(|| EngineError::UnknownBasket(basket.to_string()))?;
        Ok(contribution_analysis(
            records,
            periods,
            self.as_of.map(AsOf::Date),
            config.epsilon,
        ))
    }
}
