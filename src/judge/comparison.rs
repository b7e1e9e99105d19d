//! One judged comparison: two candidate generations and a pairwise judge call.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ExperimentConfig;
use crate::dataset::Example;
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, ModelUnavailable};
use crate::metrics;
use crate::prompts::{self, PromptInstance};

use super::order::OrderSource;
use super::types::{CandidateOutput, ExampleResult, JudgementOutcome, Variant};
use super::verdict::{parse_verdict, resolve_winner};

// =============================================================================
// Errors
// =============================================================================

/// Which model call of a comparison failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    Baseline,
    Concise,
    Judge,
}

impl CallStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStage::Baseline => "baseline",
            CallStage::Concise => "concise",
            CallStage::Judge => "judge",
        }
    }

    fn caller(&self) -> &'static str {
        match self {
            CallStage::Baseline => "judge::baseline",
            CallStage::Concise => "judge::concise",
            CallStage::Judge => "judge::verdict",
        }
    }
}

impl fmt::Display for CallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("example {example_id}: {stage} call failed: {source}")]
pub struct ComparisonError {
    pub example_id: String,
    pub stage: CallStage,
    #[source]
    pub source: ModelUnavailable,
}

// =============================================================================
// Comparison
// =============================================================================

/// Runs the baseline/concise/judge sequence for single examples.
pub struct JudgedComparison {
    gateway: Arc<dyn ChatGateway>,
    config: ExperimentConfig,
    run_id: Uuid,
}

impl JudgedComparison {
    pub fn new(gateway: Arc<dyn ChatGateway>, config: ExperimentConfig) -> Self {
        Self {
            gateway,
            config,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub async fn run(
        &self,
        example: &Example,
        order: &mut dyn OrderSource,
    ) -> Result<ExampleResult, ComparisonError> {
        let baseline = self
            .generate(example, CallStage::Baseline, prompts::baseline(&example.dialogue))
            .await?;
        let concise = self
            .generate(
                example,
                CallStage::Concise,
                prompts::concise(&example.dialogue, self.config.word_budget),
            )
            .await?;

        let presentation = order.next_presentation();
        let (first, second) = match presentation.first() {
            Variant::Baseline => (&baseline, &concise),
            Variant::Concise => (&concise, &baseline),
        };
        let judge_prompt = prompts::judge(&example.dialogue, &first.text, &second.text);
        let judged = self
            .call(
                example,
                CallStage::Judge,
                &judge_prompt,
                self.config.judge_max_tokens,
            )
            .await?;

        let raw = judged.text.trim().to_string();
        let verdict = parse_verdict(&raw);
        let outcome = JudgementOutcome {
            verdict,
            winner: resolve_winner(verdict, presentation),
            first: presentation.first(),
            raw,
            usage: judged.usage,
        };
        debug!(
            example_id = %example.id,
            first = %outcome.first,
            winner = %outcome.winner,
            "judge verdict resolved"
        );

        let result = ExampleResult {
            example_id: example.id.clone(),
            dialogue: example.dialogue.clone(),
            reference: example.summary.clone(),
            baseline_metrics: metrics::score(&example.summary, &baseline.text),
            concise_metrics: metrics::score(&example.summary, &concise.text),
            baseline: baseline.text,
            concise: concise.text,
            judge_winner: outcome.winner,
            judge_reason: outcome.raw,
            judge_first: outcome.first,
            baseline_usage: baseline.usage,
            concise_usage: concise.usage,
            judge_usage: outcome.usage,
        };

        info!(
            example_id = %result.example_id,
            winner = %result.judge_winner,
            baseline_words = result.baseline_metrics.word_count,
            concise_words = result.concise_metrics.word_count,
            tokens = result.total_usage().total_tokens,
            "example judged"
        );
        Ok(result)
    }

    async fn generate(
        &self,
        example: &Example,
        stage: CallStage,
        prompt: PromptInstance,
    ) -> Result<CandidateOutput, ComparisonError> {
        self.call(example, stage, &prompt, self.config.max_tokens).await
    }

    async fn call(
        &self,
        example: &Example,
        stage: CallStage,
        prompt: &PromptInstance,
        max_tokens: u32,
    ) -> Result<CandidateOutput, ComparisonError> {
        let attribution = Attribution::new(stage.caller())
            .with_run(self.run_id)
            .with_example(example.id.clone());
        let request = ChatRequest::new(
            ChatModel::named(self.config.model.clone()),
            prompt.to_messages(),
            attribution,
        )
        .temperature(self.config.temperature)
        .max_tokens(max_tokens);

        let response = self
            .gateway
            .chat(request)
            .await
            .map_err(|source| ComparisonError {
                example_id: example.id.clone(),
                stage,
                source,
            })?;

        Ok(CandidateOutput {
            text: response.content,
            usage: response.usage,
        })
    }
}
