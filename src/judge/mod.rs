//! Judged comparison of baseline vs concise summaries.
//!
//! Each example produces two candidates, shown to a judge model in a random
//! order; the judge's free-text answer is resolved back to a variant label.

pub mod aggregate;
pub mod comparison;
pub mod log;
pub mod order;
pub mod report;
pub mod types;
pub mod verdict;

pub use aggregate::{aggregate, AggregateError, AggregateMetrics, VariantMeans, WinRates};
pub use comparison::{CallStage, ComparisonError, JudgedComparison};
pub use log::{load_results, save_results, JsonlResultSink, LogError, LogWorker, ResultSink};
pub use order::{FixedOrder, OrderSource, RngOrder};
pub use report::{build_report, render_report_markdown, ReportOptions, RunReport};
pub use types::*;
pub use verdict::{parse_verdict, resolve_winner};
