#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::Level;

use brevity_harness::config::{ApiCredentials, ExperimentConfig};
use brevity_harness::experiment::{run_experiment, write_atomic, ExperimentRequest, MetricsSnapshot};
use brevity_harness::gateway::{ChatCompletionsAdapter, ChatGateway, ProviderGateway, TracingUsageSink};
use brevity_harness::judge::{build_report, load_results, render_report_markdown, ReportOptions};
use brevity_harness::metrics;
use brevity_harness::telemetry::init_tracing;
use brevity_harness::verbosity::verbosity_correlation;

#[derive(Parser)]
#[command(name = "brevity", version, about = "Baseline vs concise summary judging harness")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, judge and score summaries for a dataset
    Run {
        /// JSONL or JSON array of {id, dialogue, summary}
        #[arg(long)]
        examples: PathBuf,
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,
        /// JSON file overriding ExperimentConfig defaults
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        num_examples: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// JSONL of {response, verbosity} for the verbosity statistic
        #[arg(long)]
        helpsteer: Option<PathBuf>,
        /// Regenerate even if the result log exists
        #[arg(long)]
        fresh: bool,
    },
    /// Recompute metrics from an existing result log
    Aggregate {
        #[arg(long)]
        log: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long)]
        helpsteer: Option<PathBuf>,
        #[arg(long, default_value_t = 1000)]
        helpsteer_sample_size: usize,
    },
    /// Score one candidate against a reference
    Score {
        #[arg(long)]
        reference: String,
        #[arg(long)]
        candidate: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, Level::INFO);

    match cli.command {
        Commands::Run {
            examples,
            results_dir,
            config,
            model,
            num_examples,
            seed,
            helpsteer,
            fresh,
        } => {
            let mut config = match config {
                Some(path) => ExperimentConfig::from_path(path)?,
                None => ExperimentConfig::default(),
            };
            if let Some(model) = model {
                config.model = model;
            }
            if let Some(n) = num_examples {
                config.num_examples = n;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            config.validate()?;

            let creds = ApiCredentials::from_env()?;
            eprintln!("[run] endpoint {} model {}", creds.base_url, config.model);
            let adapter = ChatCompletionsAdapter::with_config(
                creds.api_key,
                creds.base_url,
                config.request_timeout(),
            )?;
            let gateway: Arc<dyn ChatGateway> = Arc::new(ProviderGateway::with_config(
                adapter,
                Arc::new(TracingUsageSink),
                config.gateway_config(),
            ));

            let mut request = ExperimentRequest::new(config, examples, results_dir).fresh(fresh);
            if let Some(path) = helpsteer {
                request = request.helpsteer(path);
            }

            let outcome = run_experiment(gateway, &request).await?;
            if outcome.reused {
                eprintln!(
                    "[run] reused {} results from {}",
                    outcome.results.len(),
                    request.log_path().display()
                );
            }
            eprintln!("[run] metrics written to {}", request.metrics_path().display());
            eprintln!("[run] report written to {}", request.report_path().display());
            println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
        }
        Commands::Aggregate {
            log,
            out,
            report,
            helpsteer,
            helpsteer_sample_size,
        } => {
            let results = load_results(&log)?;
            let verbosity = match helpsteer {
                Some(path) => Some(verbosity_correlation(path, helpsteer_sample_size)?),
                None => None,
            };
            let snapshot = MetricsSnapshot::build(&results, verbosity)?;
            let json = serde_json::to_string_pretty(&snapshot)?;

            if let Some(path) = out {
                write_atomic(&path, json.as_bytes())?;
                eprintln!("[aggregate] metrics written to {}", path.display());
            }
            if let Some(path) = report {
                let built = build_report(&results, &snapshot.aggregate, ReportOptions::default());
                write_atomic(&path, render_report_markdown(&built).as_bytes())?;
                eprintln!("[aggregate] report written to {}", path.display());
            }
            println!("{json}");
        }
        Commands::Score {
            reference,
            candidate,
        } => {
            let scores = metrics::score(&reference, &candidate);
            println!("{}", serde_json::to_string_pretty(&scores)?);
        }
    }

    Ok(())
}
