//! Usage tracking via the UsageSink trait.
//!
//! The gateway reports every attempt through a UsageSink so the retry loop
//! stays independent of where accounting ends up:
//! - the CLI uses TracingUsageSink (one structured log event per call)
//! - tests use NoopUsageSink or their own recording sink

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::types::TokenUsage;

/// Status of a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Error => "error",
        }
    }
}

/// Record of one provider attempt.
#[derive(Debug, Clone)]
pub struct ProviderCallRecord {
    /// Model used.
    pub model: String,
    /// Which code path made this call.
    pub caller: &'static str,
    /// Experiment run the call belongs to.
    pub run_id: Option<Uuid>,
    /// Example the call was made for.
    pub example_id: Option<String>,
    /// 1-based attempt number within the retry loop.
    pub attempt: u32,
    /// Token usage (empty for failed attempts).
    pub usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Call status.
    pub status: CallStatus,
    /// Error code if status is Error.
    pub error_code: Option<String>,
    /// Provider request ID (for debugging).
    pub request_id: Option<String>,
    /// When the call finished.
    pub timestamp: DateTime<Utc>,
}

impl ProviderCallRecord {
    /// Create a new record with required fields, defaulting others.
    pub fn new(model: impl Into<String>, caller: &'static str, attempt: u32) -> Self {
        Self {
            model: model.into(),
            caller,
            run_id: None,
            example_id: None,
            attempt,
            usage: TokenUsage::default(),
            latency_ms: 0,
            status: CallStatus::Success,
            error_code: None,
            request_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn run(mut self, run_id: Option<Uuid>) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn example(mut self, example_id: Option<String>) -> Self {
        self.example_id = example_id;
        self
    }

    pub fn latency(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn error(mut self, code: impl Into<String>) -> Self {
        self.status = CallStatus::Error;
        self.error_code = Some(code.into());
        self
    }

    pub fn request_id(mut self, id: Option<String>) -> Self {
        self.request_id = id;
        self
    }
}

/// Trait for recording provider call usage.
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Record a provider call. Fire-and-forget: failures inside the sink must
    /// not propagate into the call path.
    async fn record(&self, record: ProviderCallRecord);
}

/// No-op usage sink that discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUsageSink;

#[async_trait]
impl UsageSink for NoopUsageSink {
    async fn record(&self, _record: ProviderCallRecord) {}
}

/// Usage sink that emits one `tracing` event per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageSink;

#[async_trait]
impl UsageSink for TracingUsageSink {
    async fn record(&self, record: ProviderCallRecord) {
        info!(
            target: "brevity::usage",
            model = %record.model,
            caller = record.caller,
            run_id = ?record.run_id,
            example_id = record.example_id.as_deref().unwrap_or(""),
            attempt = record.attempt,
            prompt_tokens = record.usage.prompt_tokens.unwrap_or(0),
            completion_tokens = record.usage.completion_tokens.unwrap_or(0),
            total_tokens = record.usage.total_tokens.unwrap_or(0),
            latency_ms = record.latency_ms,
            status = record.status.as_str(),
            error_code = record.error_code.as_deref().unwrap_or(""),
            request_id = record.request_id.as_deref().unwrap_or(""),
            "provider call"
        );
    }
}
