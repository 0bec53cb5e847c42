// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::error::StepError;

/// The state mapping threaded through a run
pub type StateMap = Map<String, Value>;

/// Per-invocation context handed to a step.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub run_id: String,
    pub node: String,
    /// Cancelled when the run is cancelled; long-running steps may watch it
    pub cancel: CancellationToken,
}

impl StepContext {
    pub fn new(run_id: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            node: node.into(),
            cancel: CancellationToken::new(),
        }
    }
}

/// A unit of work bound to a name in the step registry.
///
/// A step receives the current run state and returns the fields to merge into
/// it. Synchronous and asynchronous closures are both adapted to this trait
/// (see [`BlockingStep`] and [`AsyncStep`]), so the executor only ever awaits
/// `invoke`.
#[async_trait]
pub trait Step: Send + Sync {
    async fn invoke(&self, state: &StateMap, ctx: &StepContext) -> Result<StateMap, StepError>;
}

/// Adapter for synchronous step functions.
///
/// The function runs on Tokio's blocking pool so a slow step cannot stall
/// other runs sharing the runtime.
pub struct BlockingStep<F> {
    func: Arc<F>,
}

impl<F> BlockingStep<F>
where
    F: Fn(&StateMap) -> Result<StateMap, StepError> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl<F> Step for BlockingStep<F>
where
    F: Fn(&StateMap) -> Result<StateMap, StepError> + Send + Sync + 'static,
{
    async fn invoke(&self, state: &StateMap, _ctx: &StepContext) -> Result<StateMap, StepError> {
        let func = Arc::clone(&self.func);
        let state = state.clone();
        tokio::task::spawn_blocking(move || func(&state)).await?
    }
}

/// Adapter for asynchronous closures.
pub struct AsyncStep<F> {
    func: F,
}

impl<F> AsyncStep<F>
where
    F: Fn(StateMap, StepContext) -> BoxFuture<'static, Result<StateMap, StepError>>
        + Send
        + Sync
        + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Step for AsyncStep<F>
where
    F: Fn(StateMap, StepContext) -> BoxFuture<'static, Result<StateMap, StepError>>
        + Send
        + Sync
        + 'static,
{
    async fn invoke(&self, state: &StateMap, ctx: &StepContext) -> Result<StateMap, StepError> {
        (self.func)(state.clone(), ctx.clone()).await
    }
}
