//! Reduction of per-example results into run-level statistics.

use serde::{Deserialize, Serialize};

use crate::gateway::UsageTotals;

use super::types::{ExampleResult, Variant, Winner};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("cannot aggregate an empty result set")]
    EmptyResultSet,
}

/// A per-variant mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantMeans {
    pub baseline: f64,
    pub concise: f64,
}

impl VariantMeans {
    pub fn get(&self, variant: Variant) -> f64 {
        match variant {
            Variant::Baseline => self.baseline,
            Variant::Concise => self.concise,
        }
    }
}

/// Share of examples won by each label; the three rates sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinRates {
    pub concise: f64,
    pub baseline: f64,
    pub tie: f64,
}

impl WinRates {
    pub fn get(&self, winner: Winner) -> f64 {
        match winner {
            Winner::Baseline => self.baseline,
            Winner::Concise => self.concise,
            Winner::Tie => self.tie,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub n: usize,
    pub length_mean: VariantMeans,
    pub rouge_l_mean: VariantMeans,
    pub flesch_mean: VariantMeans,
    pub judge_win_rate: WinRates,
    /// Tokens over every generation and judge call.
    pub token_totals: UsageTotals,
}

pub fn aggregate(results: &[ExampleResult]) -> Result<AggregateMetrics, AggregateError> {
    if results.is_empty() {
        return Err(AggregateError::EmptyResultSet);
    }
    let n = results.len() as f64;

    let means = |f: fn(&ExampleResult, Variant) -> f64| VariantMeans {
        baseline: results.iter().map(|r| f(r, Variant::Baseline)).sum::<f64>() / n,
        concise: results.iter().map(|r| f(r, Variant::Concise)).sum::<f64>() / n,
    };
    let rate = |winner: Winner| {
        results.iter().filter(|r| r.judge_winner == winner).count() as f64 / n
    };

    let mut token_totals = UsageTotals::default();
    for r in results {
        token_totals.merge(&r.total_usage());
    }

    Ok(AggregateMetrics {
        n: results.len(),
        length_mean: means(|r, v| r.metrics(v).word_count as f64),
        rouge_l_mean: means(|r, v| r.metrics(v).overlap_f),
        flesch_mean: means(|r, v| r.metrics(v).readability),
        judge_win_rate: WinRates {
            concise: rate(Winner::Concise),
            baseline: rate(Winner::Baseline),
            tie: rate(Winner::Tie),
        },
        token_totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::TokenUsage;
    use crate::metrics::TextScores;

    fn result(id: &str, winner: Winner, base_words: usize, concise_words: usize) -> ExampleResult {
        ExampleResult {
            example_id: id.to_string(),
            dialogue: "d".into(),
            reference: "r".into(),
            baseline: "b".into(),
            concise: "c".into(),
            judge_winner: winner,
            judge_reason: "A".into(),
            judge_first: Variant::Baseline,
            baseline_usage: TokenUsage::new(10, 5),
            concise_usage: TokenUsage::new(12, 4),
            judge_usage: TokenUsage::default(),
            baseline_metrics: TextScores {
                overlap_f: 0.5,
                word_count: base_words,
                readability: 60.0,
            },
            concise_metrics: TextScores {
                overlap_f: 0.25,
                word_count: concise_words,
                readability: 80.0,
            },
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(aggregate(&[]), Err(AggregateError::EmptyResultSet));
    }

    #[test]
    fn all_concise_wins() {
        let rows: Vec<_> = (0..3)
            .map(|i| result(&i.to_string(), Winner::Concise, 100, 40))
            .collect();
        let m = aggregate(&rows).unwrap();
        assert_eq!(m.n, 3);
        assert_eq!(m.judge_win_rate.concise, 1.0);
        assert_eq!(m.judge_win_rate.baseline, 0.0);
        assert_eq!(m.judge_win_rate.tie, 0.0);
    }

    #[test]
    fn means_and_rates() {
        let rows = vec![
            result("1", Winner::Baseline, 100, 40),
            result("2", Winner::Concise, 120, 60),
            result("3", Winner::Tie, 110, 50),
            result("4", Winner::Concise, 90, 30),
        ];
        let m = aggregate(&rows).unwrap();
        assert_eq!(m.length_mean.get(Variant::Baseline), 105.0);
        assert_eq!(m.length_mean.get(Variant::Concise), 45.0);
        assert_eq!(m.rouge_l_mean.baseline, 0.5);
        assert_eq!(m.flesch_mean.concise, 80.0);
        assert_eq!(m.judge_win_rate.get(Winner::Concise), 0.5);
        let sum: f64 = Winner::ALL.iter().map(|w| m.judge_win_rate.get(*w)).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(m.token_totals.prompt_tokens, 4 * 22);
        assert_eq!(m.token_totals.total_tokens, 4 * 31);
    }

    #[test]
    fn serializes_with_snapshot_keys() {
        let m = aggregate(&[result("1", Winner::Tie, 10, 5)]).unwrap();
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["n"], 1);
        assert_eq!(value["length_mean"]["baseline"], 10.0);
        assert_eq!(value["judge_win_rate"]["tie"], 1.0);
        assert!(value["token_totals"]["total_tokens"].is_u64());
    }
}
