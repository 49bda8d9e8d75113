// Reports module - period returns, relative performance, and contribution tables

pub mod contribution;
pub mod performance;
pub mod period;
pub mod relative;

pub use contribution::{contribution_analysis, Contribution, ContributionRow, ContributionTable};
pub use performance::{latest_date, performance_summary, PerformanceSummary};
pub use period::{calculate_period_return, parse_periods, AsOf, Period};
pub use relative::{relative_performance, relative_performance_for, RelativeRow};
