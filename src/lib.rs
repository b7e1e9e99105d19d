#![forbid(unsafe_code)]

//! # brevity-harness
//!
//! Does a structured, word-budgeted brief communicate better than a plain
//! fluent summary? This crate asks an LLM for both on each dialogue, shows
//! the pair to an LLM judge in a random order to cancel position bias, maps
//! the judge's "A"/"B" answer back to the variant it names, and scores each
//! candidate with ROUGE-L, word count and Flesch reading ease.
//!
//! Results are logged one JSON line per example and reduced into a metrics
//! snapshot and a markdown report.

pub mod config;
pub mod dataset;
pub mod experiment;
pub mod gateway;
pub mod judge;
pub mod metrics;
pub mod prompts;
pub mod telemetry;
pub mod verbosity;

pub use config::{ApiCredentials, ConfigError, ExperimentConfig};
pub use dataset::{load_examples, Example};
pub use experiment::{run_experiment, ExperimentError, ExperimentRequest, MetricsSnapshot};
pub use gateway::{Attribution, ChatGateway, ModelUnavailable, ProviderGateway, UsageSink};
pub use judge::{
    aggregate, load_results, AggregateMetrics, ComparisonError, ExampleResult, JudgedComparison,
    OrderSource, Winner,
};
pub use metrics::{score, TextScores};
