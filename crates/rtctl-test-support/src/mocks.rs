//! Scripted transport that replays queued replies and records every call.

use std::collections::VecDeque;

use async_trait::async_trait;
use rtctl_core::{MULTICALL_METHOD, Transport, TransportError, Value};
use tokio::sync::Mutex;

/// One call observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Remote method name.
    pub method: String,
    /// Parameters as sent.
    pub params: Vec<Value>,
}

impl RecordedCall {
    /// Inner `(method, params)` entries when this call was a `system.multicall`.
    #[must_use]
    pub fn multicall_entries(&self) -> Vec<(String, Vec<Value>)> {
        if self.method != MULTICALL_METHOD {
            return Vec::new();
        }
        let Some(entries) = self.params.first().and_then(Value::as_array) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(Value::as_struct)
            .map(|entry| {
                let method = entry
                    .get("methodName")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let params = entry
                    .get("params")
                    .and_then(Value::as_array)
                    .map(<[Value]>::to_vec)
                    .unwrap_or_default();
                (method, params)
            })
            .collect()
    }
}

/// Transport double: pops one queued reply per call, in order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    /// Transport with no queued replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply for the next call.
    #[must_use]
    pub fn with_reply(mut self, value: impl Into<Value>) -> Self {
        self.replies.get_mut().push_back(Ok(value.into()));
        self
    }

    /// Queue a `system.multicall` reply built from its elements.
    #[must_use]
    pub fn with_multicall(self, results: Vec<Value>) -> Self {
        self.with_reply(Value::Array(results))
    }

    /// Queue a transport failure for the next call.
    #[must_use]
    pub fn with_error(mut self, error: TransportError) -> Self {
        self.replies.get_mut().push_back(Err(error));
        self
    }

    /// Every call observed so far.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Number of replies still queued.
    pub async fn pending(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        self.calls.lock().await.push(RecordedCall {
            method: method.to_string(),
            params,
        });
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::UnexpectedResponse {
                    method: method.to_string(),
                    reason: "no scripted reply queued",
                })
            })
    }
}
