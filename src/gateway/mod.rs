//! Provider gateway: retry-wrapped chat completions with usage accounting.

pub mod chat_completions;
pub mod error;
pub mod types;
pub mod usage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, warn};

use chat_completions::ChatProvider;
use usage::{ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use chat_completions::ChatCompletionsAdapter;
pub use error::{ErrorContext, ModelUnavailable, ProviderError};
pub use types::*;
pub use usage::{NoopUsageSink, TracingUsageSink, UsageSink};

/// Something that turns a chat request into a response, hiding all retries.
#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ModelUnavailable>;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Total number of attempts per call (values below 1 behave as 1).
    pub max_retries: u32,
    /// Linear backoff unit: the sleep after failed attempt `k` is `backoff_base * (k + 1)`.
    pub backoff_base: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

pub struct ProviderGateway<U: UsageSinkTrait> {
    provider: Box<dyn ChatProvider>,
    usage_sink: Arc<U>,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait> ChatGateway for ProviderGateway<U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ModelUnavailable> {
        ProviderGateway::chat(self, req).await
    }
}

impl<U: UsageSinkTrait> ProviderGateway<U> {
    pub fn new(provider: impl ChatProvider + 'static, usage_sink: Arc<U>) -> Self {
        Self::with_config(provider, usage_sink, GatewayConfig::default())
    }

    pub fn with_config(
        provider: impl ChatProvider + 'static,
        usage_sink: Arc<U>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            provider: Box::new(provider),
            usage_sink,
            config,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ModelUnavailable> {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt: u32 = 0;

        loop {
            let started = Instant::now();
            let result = self.provider.chat(&req).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            attempt += 1;

            match result {
                Ok(resp) => {
                    let record = self
                        .base_record(&req, attempt, elapsed_ms)
                        .usage(resp.usage)
                        .request_id(resp.request_id.clone());
                    self.usage_sink.record(record).await;
                    debug!(
                        caller = req.attribution.caller,
                        attempt,
                        latency_ms = elapsed_ms,
                        "chat call succeeded"
                    );
                    return Ok(resp);
                }
                Err(err) => {
                    let record = self
                        .base_record(&req, attempt, elapsed_ms)
                        .request_id(err.request_id().map(str::to_string))
                        .error(err.code());
                    self.usage_sink.record(record).await;

                    if attempt >= max_attempts {
                        warn!(
                            caller = req.attribution.caller,
                            attempts = attempt,
                            error = %err,
                            "chat call exhausted retries"
                        );
                        return Err(ModelUnavailable {
                            model: req.model.model_id().to_string(),
                            attempts: attempt,
                            last_error: err,
                        });
                    }

                    let delay = backoff_delay(self.config.backoff_base, attempt - 1);
                    warn!(
                        caller = req.attribution.caller,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "chat call failed; retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    fn base_record(&self, req: &ChatRequest, attempt: u32, latency_ms: u64) -> ProviderCallRecord {
        ProviderCallRecord::new(req.model.model_id(), req.attribution.caller, attempt)
            .run(req.attribution.run_id)
            .example(req.attribution.example_id.clone())
            .latency(latency_ms)
    }
}

/// Sleep before the retry that follows failed attempt `attempt_index` (0-based).
pub fn backoff_delay(base: Duration, attempt_index: u32) -> Duration {
    base.checked_mul(attempt_index.saturating_add(1))
        .unwrap_or(Duration::MAX)
}
