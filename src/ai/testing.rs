//! Scripted transport for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use super::client::{ChatTransport, CompletionRequest, GatewayError};

/// Replays queued responses in order and records every request.
/// Once the queue is empty it answers with the fallback response, if any.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<String, GatewayError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request with `text`
    pub fn always(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn then_ok(self, text: &str) -> Self {
        self.push(Ok(text.to_string()))
    }

    pub fn then_err(self, err: GatewayError) -> Self {
        self.push(Err(err))
    }

    fn push(self, entry: Result<String, GatewayError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match (next, &self.fallback) {
            (Some(entry), _) => entry,
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(GatewayError::Transport("script exhausted".to_string())),
        }
    }
}
