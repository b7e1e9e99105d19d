//! Markdown report for a finished run.

use serde::Serialize;

use super::aggregate::AggregateMetrics;
use super::types::{ExampleResult, Variant, Winner};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportOptions {
    pub run_id: Option<String>,
    pub model: Option<String>,
    pub seed: Option<u64>,
    /// Log was reloaded rather than generated.
    pub reused: bool,
}

/// Five-number summary of word counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LengthDistribution {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub options: ReportOptions,
    pub metrics: AggregateMetrics,
    pub baseline_lengths: Option<LengthDistribution>,
    pub concise_lengths: Option<LengthDistribution>,
}

impl RunReport {
    pub fn lengths(&self, variant: Variant) -> Option<&LengthDistribution> {
        match variant {
            Variant::Baseline => self.baseline_lengths.as_ref(),
            Variant::Concise => self.concise_lengths.as_ref(),
        }
    }
}

pub fn build_report(
    results: &[ExampleResult],
    metrics: &AggregateMetrics,
    options: ReportOptions,
) -> RunReport {
    let lengths = |variant: Variant| {
        let words: Vec<f64> = results
            .iter()
            .map(|r| r.metrics(variant).word_count as f64)
            .collect();
        length_distribution(&words)
    };
    RunReport {
        options,
        metrics: metrics.clone(),
        baseline_lengths: lengths(Variant::Baseline),
        concise_lengths: lengths(Variant::Concise),
    }
}

pub fn length_distribution(values: &[f64]) -> Option<LengthDistribution> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(LengthDistribution {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn render_report_markdown(report: &RunReport) -> String {
    let m = &report.metrics;
    let mut out = String::new();
    out.push_str("# Brevity Run Report\n\n");
    if let Some(run_id) = &report.options.run_id {
        out.push_str(&format!("- Run ID: `{}`\n", run_id));
    }
    if let Some(model) = &report.options.model {
        out.push_str(&format!("- Model: {}\n", model));
    }
    if let Some(seed) = report.options.seed {
        out.push_str(&format!("- RNG seed: {}\n", seed));
    }
    out.push_str(&format!("- Examples: {}\n", m.n));
    if report.options.reused {
        out.push_str("- Outputs reused from existing log: true\n");
    }

    out.push_str("\n## Means\n\n");
    out.push_str("| variant | words | ROUGE-L F | Flesch |\n");
    out.push_str("|---|---:|---:|---:|\n");
    for variant in [Variant::Baseline, Variant::Concise] {
        out.push_str(&format!(
            "| {} | {:.1} | {:.3} | {:.2} |\n",
            variant,
            m.length_mean.get(variant),
            m.rouge_l_mean.get(variant),
            m.flesch_mean.get(variant)
        ));
    }

    out.push_str("\n## Judge Win Rate\n\n");
    for winner in Winner::ALL {
        out.push_str(&format!(
            "- {}: {:.1}%\n",
            winner,
            m.judge_win_rate.get(winner) * 100.0
        ));
    }

    out.push_str("\n## Tokens\n\n");
    out.push_str(&format!(
        "- prompt/completion/total: {}/{}/{}\n",
        m.token_totals.prompt_tokens, m.token_totals.completion_tokens, m.token_totals.total_tokens
    ));

    out.push_str("\n## Length Distribution (words)\n\n");
    out.push_str("| variant | min | q1 | median | q3 | max |\n");
    out.push_str("|---|---:|---:|---:|---:|---:|\n");
    for variant in [Variant::Baseline, Variant::Concise] {
        if let Some(d) = report.lengths(variant) {
            out.push_str(&format!(
                "| {} | {:.0} | {:.1} | {:.1} | {:.1} | {:.0} |\n",
                variant, d.min, d.q1, d.median, d.q3, d.max
            ));
        }
    }

    out
}
