//! Error handling for the basket performance engine
//!
//! Configuration-class failures get a typed `EngineError`; everything is
//! propagated through the anyhow-based `Result` alias for context chaining.
//! Data-quality gaps (missing prices, zero ratios, near-zero denominators)
//! are recovered where they happen and never show up here.

use thiserror::Error;

/// Core error types for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown period label: {0}")]
    UnknownPeriod(String),

    #[error("no benchmark mapped for basket {0}")]
    MissingBenchmark(String),

    #[error("benchmark {benchmark} for basket {basket} has no performance data")]
    BenchmarkNotInSummary { basket: String, benchmark: String },

    #[error("unknown basket: {0}")]
    UnknownBasket(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = EngineError::UnknownPeriod("2w".to_string());
        assert_eq!(err.to_string(), "unknown period label: 2w");
    }

    #[test]
    fn test_benchmark_errors_name_the_basket() {
        let err = EngineError::MissingBenchmark("Tech".to_string());
        assert!(err.to_string().contains("Tech"));

        let err = EngineError::BenchmarkNotInSummary {
            basket: "Tech".to_string(),
            benchmark: "QQQ".to_string(),
        };
        assert!(err.to_string().contains("QQQ"));
        assert!(err.to_string().contains("Tech"));
    }

    #[test]
    fn test_engine_error_downcasts_through_anyhow() {
        use anyhow::Context;
        let result: Result<()> = Err(EngineError::UnknownBasket("Growth".to_string()))
            .context("failed to build contribution table");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("contribution table"));
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::UnknownBasket(name)) if name == "Growth"
        ));
    }
}
