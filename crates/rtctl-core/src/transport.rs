//! Transport seam between descriptor lists and the wire.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::descriptor::MethodDescriptor;
use crate::error::TransportError;
use crate::value::Value;

/// Remote method that executes a list of calls in one round trip.
pub const MULTICALL_METHOD: &str = "system.multicall";

/// Carries calls to the daemon and returns their raw results.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one remote call.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError>;

    /// Issue every descriptor in one `system.multicall`, returning results in
    /// request order. Per-call faults are returned in place, not raised.
    async fn multicall(&self, methods: &[MethodDescriptor]) -> Result<Vec<Value>, TransportError> {
        let entries = methods
            .iter()
            .map(MethodDescriptor::to_multicall_entry)
            .collect();
        debug!(calls = methods.len(), "issuing multicall");
        match self.call(MULTICALL_METHOD, vec![Value::Array(entries)]).await? {
            Value::Array(results) => Ok(results),
            _ => Err(TransportError::UnexpectedResponse {
                method: MULTICALL_METHOD.to_string(),
                reason: "multicall result is not an array",
            }),
        }
    }
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        (**self).call(method, params).await
    }

    async fn multicall(&self, methods: &[MethodDescriptor]) -> Result<Vec<Value>, TransportError> {
        (**self).multicall(methods).await
    }
}
