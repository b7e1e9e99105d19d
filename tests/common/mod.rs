#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use brevity_harness::config::ExperimentConfig;
use brevity_harness::gateway::{
    ChatGateway, ChatRequest, ChatResponse, FinishReason, ModelUnavailable, ProviderError,
    TokenUsage,
};

pub const DIALOGUE: &str = "A: Let's meet Friday. B: Works for me.";
pub const REFERENCE: &str = "They agree to meet Friday.";
pub const BASELINE_TEXT: &str = "Alice and Bob agree to meet on Friday.";
pub const CONCISE_TEXT: &str =
    "- Meet Friday\n- TL;DR: Friday meeting agreed.\n- Uncertainties: None noted";

pub fn config() -> ExperimentConfig {
    ExperimentConfig {
        model: "stub-model".to_string(),
        ..ExperimentConfig::default()
    }
}

/// Replies in call order; `None` entries fail with `ModelUnavailable`.
pub struct StubGateway {
    replies: Mutex<VecDeque<Option<String>>>,
    cycle: Vec<Option<String>>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl StubGateway {
    pub fn scripted(replies: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            cycle: Vec::new(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Baseline, concise, judge for every example.
    pub fn cycling(judge: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            cycle: vec![
                Some(BASELINE_TEXT.to_string()),
                Some(CONCISE_TEXT.to_string()),
                Some(judge.to_string()),
            ],
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatGateway for StubGateway {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ModelUnavailable> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req.clone());

        let reply = match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None if !self.cycle.is_empty() => self.cycle[n % self.cycle.len()].clone(),
            None => None,
        };

        match reply {
            Some(content) => Ok(ChatResponse {
                content,
                usage: TokenUsage::new(10, 5),
                latency: Duration::from_millis(1),
                finish_reason: FinishReason::Stop,
                request_id: None,
            }),
            None => Err(ModelUnavailable {
                model: req.model.model_id().to_string(),
                attempts: 3,
                last_error: ProviderError::provider("stub", "unavailable"),
            }),
        }
    }
}
