//! Basketperf - basket performance and return attribution engine
//!
//! This library turns weighted baskets of securities into daily return
//! series, rebased performance curves, standard period returns, relative
//! performance against mapped benchmarks, and per-ticker contribution
//! breakdowns.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod reports;
pub mod returns;
pub mod store;
pub mod utils;
