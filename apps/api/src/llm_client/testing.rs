//! In-process `ModelGateway` double: replays queued replies and records every request.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, Semaphore};

use super::{LlmError, ModelGateway, ModelRequest};

#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful reply whose content is `value` serialized as JSON.
    pub fn reply_json(self, value: serde_json::Value) -> Self {
        self.reply_raw(value.to_string())
    }

    pub fn reply_raw(self, content: impl Into<String>) -> Self {
        self.replies.try_lock().unwrap().push_back(Ok(content.into()));
        self
    }

    pub fn fail(self, error: LlmError) -> Self {
        self.replies.try_lock().unwrap().push_back(Err(error));
        self
    }

    pub async fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError> {
        self.requests.lock().await.push(request.clone());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyContent))
    }
}

/// Wraps a `ScriptedGateway` and parks every call until `release` is called,
/// so tests can observe state while a model call is in flight.
pub struct HeldGateway {
    inner: ScriptedGateway,
    entered: Notify,
    gate: Semaphore,
}

impl HeldGateway {
    pub fn new(inner: ScriptedGateway) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Resolves once a call has reached the gateway.
    pub async fn wait_until_called(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl ModelGateway for HeldGateway {
    async fn complete(&self, request: &ModelRequest) -> Result<String, LlmError> {
        self.entered.notify_one();
        let permit = self.gate.acquire().await.map_err(|_| LlmError::EmptyContent)?;
        permit.forget();
        self.inner.complete(request).await
    }
}
