//! Sequential experiment driver.
//!
//! Loads examples, judges each one in turn, streams results to the log and
//! finally writes `metrics.json` and `report.md` into the results directory.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, ExperimentConfig};
use crate::dataset::{load_examples, DatasetError};
use crate::gateway::{ChatGateway, UsageTotals};
use crate::judge::{
    aggregate, build_report, load_results, render_report_markdown, AggregateError,
    AggregateMetrics, ComparisonError, ExampleResult, JsonlResultSink, JudgedComparison,
    LogError, ReportOptions, ResultSink, RngOrder,
};
use crate::prompts::template_hashes;
use crate::verbosity::{verbosity_correlation, VerbosityCorrelation, VerbosityError};

pub const LOG_FILE: &str = "model_outputs.jsonl";
pub const METRICS_FILE: &str = "metrics.json";
pub const REPORT_FILE: &str = "report.md";

#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Comparison(#[from] ComparisonError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("result log: {0}")]
    Log(#[from] LogError),
    #[error(transparent)]
    Verbosity(#[from] VerbosityError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Inputs for one experiment run.
#[derive(Debug, Clone)]
pub struct ExperimentRequest {
    pub config: ExperimentConfig,
    pub examples_path: PathBuf,
    pub results_dir: PathBuf,
    /// Optional `{response, verbosity}` dataset for the verbosity statistic.
    pub helpsteer_path: Option<PathBuf>,
    /// Regenerate even when a result log already exists.
    pub fresh: bool,
}

impl ExperimentRequest {
    pub fn new(
        config: ExperimentConfig,
        examples_path: impl Into<PathBuf>,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            examples_path: examples_path.into(),
            results_dir: results_dir.into(),
            helpsteer_path: None,
            fresh: false,
        }
    }

    pub fn helpsteer(mut self, path: impl Into<PathBuf>) -> Self {
        self.helpsteer_path = Some(path.into());
        self
    }

    pub fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn log_path(&self) -> PathBuf {
        self.results_dir.join(LOG_FILE)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.results_dir.join(METRICS_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.results_dir.join(REPORT_FILE)
    }
}

/// Aggregate metrics as written to `metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub aggregate: AggregateMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helpsteer_verbosity: Option<VerbosityCorrelation>,
    /// Template slug -> blake3 of its text.
    pub prompt_hashes: BTreeMap<String, String>,
}

impl MetricsSnapshot {
    pub fn build(
        results: &[ExampleResult],
        helpsteer_verbosity: Option<VerbosityCorrelation>,
    ) -> Result<Self, AggregateError> {
        Ok(Self {
            aggregate: aggregate(results)?,
            helpsteer_verbosity,
            prompt_hashes: template_hashes(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    pub run_id: Uuid,
    pub results: Vec<ExampleResult>,
    pub snapshot: MetricsSnapshot,
    /// Results came from an existing log; no model calls were made.
    pub reused: bool,
}

pub async fn run_experiment(
    gateway: Arc<dyn ChatGateway>,
    request: &ExperimentRequest,
) -> Result<ExperimentOutcome, ExperimentError> {
    request.config.validate()?;
    tokio::fs::create_dir_all(&request.results_dir)
        .await
        .map_err(|source| ExperimentError::Io {
            path: request.results_dir.clone(),
            source,
        })?;

    let run_id = Uuid::new_v4();
    let log_path = request.log_path();
    let reused = log_path.exists() && !request.fresh;

    let results = if reused {
        info!(path = %log_path.display(), "reusing existing outputs");
        load_results(&log_path)?
    } else {
        generate(gateway, request, run_id, &log_path).await?
    };

    let verbosity = match &request.helpsteer_path {
        Some(path) => Some(verbosity_correlation(
            path,
            request.config.helpsteer_sample_size,
        )?),
        None => None,
    };
    let snapshot = MetricsSnapshot::build(&results, verbosity)?;
    write_atomic(
        &request.metrics_path(),
        serde_json::to_string_pretty(&snapshot)?.as_bytes(),
    )?;

    let report = build_report(
        &results,
        &snapshot.aggregate,
        ReportOptions {
            run_id: (!reused).then(|| run_id.to_string()),
            model: Some(request.config.model.clone()),
            seed: Some(request.config.seed),
            reused,
        },
    );
    write_atomic(
        &request.report_path(),
        render_report_markdown(&report).as_bytes(),
    )?;

    info!(
        n = snapshot.aggregate.n,
        concise_win_rate = snapshot.aggregate.judge_win_rate.concise,
        metrics = %request.metrics_path().display(),
        "experiment complete"
    );
    Ok(ExperimentOutcome {
        run_id,
        results,
        snapshot,
        reused,
    })
}

async fn generate(
    gateway: Arc<dyn ChatGateway>,
    request: &ExperimentRequest,
    run_id: Uuid,
    log_path: &Path,
) -> Result<Vec<ExampleResult>, ExperimentError> {
    let examples = load_examples(&request.examples_path, request.config.num_examples)?;
    info!(
        n = examples.len(),
        model = %request.config.model,
        seed = request.config.seed,
        %run_id,
        "starting generation"
    );

    let comparison = JudgedComparison::new(gateway, request.config.clone()).with_run_id(run_id);
    let mut order = RngOrder::seeded(request.config.seed);

    let partial = partial_path(log_path);
    let (sink, worker) = JsonlResultSink::create(&partial)?;
    let mut results = Vec::with_capacity(examples.len());
    let mut totals = UsageTotals::default();

    for example in &examples {
        match comparison.run(example, &mut order).await {
            Ok(result) => {
                if let Err(err) = sink.record(&result) {
                    drop(sink);
                    let err = worker.into_error(err);
                    warn!(
                        error = %err,
                        partial = %partial.display(),
                        "result log writer failed; run aborted"
                    );
                    return Err(err.into());
                }
                totals.merge(&result.total_usage());
                results.push(result);
            }
            Err(err) => {
                drop(sink);
                if let Err(join_err) = worker.join() {
                    warn!(error = %join_err, "result log writer failed during abort");
                }
                warn!(
                    completed = results.len(),
                    partial = %partial.display(),
                    "run aborted; partial log kept"
                );
                return Err(err.into());
            }
        }
    }

    drop(sink);
    worker.join()?;
    tokio::fs::rename(&partial, log_path)
        .await
        .map_err(|source| ExperimentError::Io {
            path: log_path.to_path_buf(),
            source,
        })?;

    info!(
        prompt_tokens = totals.prompt_tokens,
        completion_tokens = totals.completion_tokens,
        total_tokens = totals.total_tokens,
        "total tokens used"
    );
    Ok(results)
}

/// `<log>.partial` next to the final log.
pub fn partial_path(log_path: &Path) -> PathBuf {
    let mut name = OsString::from(log_path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Write through a sibling temp file and rename into place.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ExperimentError> {
    let io_err = |source| ExperimentError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(contents).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);
    std::fs::rename(&tmp, path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_path_appends_suffix() {
        let p = partial_path(Path::new("results/model_outputs.jsonl"));
        assert_eq!(p, PathBuf::from("results/model_outputs.jsonl.partial"));
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        write_atomic(&path, b"{\"n\": 1}").unwrap();
        write_atomic(&path, b"{\"n\": 2}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"n\": 2}");
        assert!(!dir.path().join("metrics.json.tmp").exists());
    }
}
