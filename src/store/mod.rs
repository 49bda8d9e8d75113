// Store module - basket/benchmark record sources consumed by the engine

pub mod files;
pub mod models;

use chrono::FixedOffset;
use std::collections::BTreeMap;

pub use models::{Basket, BenchmarkMap, CompanyInfo, PriceRecord};

/// Source of baskets, benchmark prices, and the basket -> benchmark mapping.
///
/// The engine only reads through this trait; how records are persisted is
/// the implementor's business.
pub trait BasketStore {
    /// Basket names in a stable order
    fn basket_names(&self) -> Vec<String>;

    fn basket(&self, name: &str) -> Option<&Basket>;

    /// Price records for a benchmark ticker. Weights are ignored.
    fn benchmark_records(&self, ticker: &str) -> Option<&[PriceRecord]>;

    /// Timezone of a benchmark's date index, if its source carried one
    fn benchmark_tz(&self, _ticker: &str) -> Option<FixedOffset> {
        None
    }

    fn benchmark_map(&self) -> &BenchmarkMap;
}

/// In-memory store for callers that already hold the records
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    baskets: BTreeMap<String, Basket>,
    benchmarks: BTreeMap<String, Vec<PriceRecord>>,
    benchmark_tz: BTreeMap<String, FixedOffset>,
    mapping: BenchmarkMap,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_basket(&mut self, basket: Basket) {
        self.baskets.insert(basket.name.clone(), basket);
    }

    /// Append price records for a benchmark ticker
    pub fn add_benchmark_records(&mut self, ticker: &str, records: Vec<PriceRecord>) {
        self.benchmarks
            .entry(ticker.to_string())
            .or_default()
            .extend(records);
    }

    pub fn set_benchmark_tz(&mut self, ticker: &str, tz: FixedOffset) {
        self.benchmark_tz.insert(ticker.to_string(), tz);
    }

    pub fn map_benchmark(&mut self, basket: &str, ticker: &str) {
        self.mapping.insert(basket.to_string(), ticker.to_string());
    }

    pub fn basket_count(&self) -> usize {
        self.baskets.len()
    }
}

impl BasketStore for MemoryStore {
    fn basket_names(&self) -> Vec<String> {
        self.baskets.keys().cloned().collect()
    }

    fn basket(&self, name: &str) -> Option<&Basket> {
        self.baskets.get(name)
    }

    fn benchmark_records(&self, ticker: &str) -> Option<&[PriceRecord]> {
        self.benchmarks.get(ticker).map(|r| r.as_slice())
    }

    fn benchmark_tz(&self, ticker: &str) -> Option<FixedOffset> {
        self.benchmark_tz.get(ticker).copied()
    }

    fn benchmark_map(&self) -> &BenchmarkMap {
        &self.mapping
    }
}
