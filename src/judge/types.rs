//! Types shared by the judged-comparison pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gateway::{TokenUsage, UsageTotals};
use crate::metrics::TextScores;

// =============================================================================
// Labels
// =============================================================================

/// Prompting strategy that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Baseline,
    Concise,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Baseline => "baseline",
            Variant::Concise => "concise",
        }
    }

    pub fn other(&self) -> Variant {
        match self {
            Variant::Baseline => Variant::Concise,
            Variant::Concise => Variant::Baseline,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic outcome of a judged comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Baseline,
    Concise,
    Tie,
}

impl Winner {
    pub const ALL: [Winner; 3] = [Winner::Baseline, Winner::Concise, Winner::Tie];

    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Baseline => "baseline",
            Winner::Concise => "concise",
            Winner::Tie => "tie",
        }
    }
}

impl From<Variant> for Winner {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Baseline => Winner::Baseline,
            Variant::Concise => Winner::Concise,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional outcome as the judge saw it: "A" is first, "B" is second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    First,
    Second,
    Tie,
}

/// Which variant the judge sees in slot "A".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    BaselineFirst,
    ConciseFirst,
}

impl Presentation {
    pub fn with_first(first: Variant) -> Self {
        match first {
            Variant::Baseline => Presentation::BaselineFirst,
            Variant::Concise => Presentation::ConciseFirst,
        }
    }

    pub fn first(&self) -> Variant {
        match self {
            Presentation::BaselineFirst => Variant::Baseline,
            Presentation::ConciseFirst => Variant::Concise,
        }
    }

    pub fn second(&self) -> Variant {
        self.first().other()
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// One generated summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutput {
    pub text: String,
    pub usage: TokenUsage,
}

/// The judge call and its de-randomized result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgementOutcome {
    pub verdict: Verdict,
    pub winner: Winner,
    /// Variant that was shown as "A".
    pub first: Variant,
    /// Judge response, trimmed.
    pub raw: String,
    pub usage: TokenUsage,
}

/// Everything recorded for one example; one line in the result log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleResult {
    pub example_id: String,
    pub dialogue: String,
    pub reference: String,
    pub baseline: String,
    pub concise: String,
    pub judge_winner: Winner,
    pub judge_reason: String,
    pub judge_first: Variant,
    pub baseline_usage: TokenUsage,
    pub concise_usage: TokenUsage,
    pub judge_usage: TokenUsage,
    pub baseline_metrics: TextScores,
    pub concise_metrics: TextScores,
}

impl ExampleResult {
    pub fn metrics(&self, variant: Variant) -> &TextScores {
        match variant {
            Variant::Baseline => &self.baseline_metrics,
            Variant::Concise => &self.concise_metrics,
        }
    }

    /// Sum of the two generation calls and the judge call.
    pub fn total_usage(&self) -> UsageTotals {
        [&self.baseline_usage, &self.concise_usage, &self.judge_usage]
            .into_iter()
            .collect()
    }
}
