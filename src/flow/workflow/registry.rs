// SPDX-License-Identifier: MIT

use crate::engine::{AsyncStep, BlockingStep, FlowError, StateMap, Step, StepContext, StepError};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Name → step lookup shared by the executor and the transport layer.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct StepRegistry {
    steps: Arc<RwLock<HashMap<String, Arc<dyn Step>>>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            steps: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Bind `name` to `step`; names cannot be rebound
    pub async fn register(&self, name: &str, step: Arc<dyn Step>) -> Result<(), FlowError> {
        let mut steps = self.steps.write().await;
        if steps.contains_key(name) {
            return Err(FlowError::DuplicateStep(name.to_string()));
        }
        steps.insert(name.to_string(), step);
        log::info!("Registered tool: {}", name);
        Ok(())
    }

    /// Register a synchronous function; it runs on the blocking pool
    pub async fn register_fn<F>(&self, name: &str, func: F) -> Result<(), FlowError>
    where
        F: Fn(&StateMap) -> Result<StateMap, StepError> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(BlockingStep::new(func))).await
    }

    /// Register an async closure
    pub async fn register_async<F>(&self, name: &str, func: F) -> Result<(), FlowError>
    where
        F: Fn(StateMap, StepContext) -> BoxFuture<'static, Result<StateMap, StepError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, Arc::new(AsyncStep::new(func))).await
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Step>> {
        let steps = self.steps.read().await;
        steps.get(name).cloned()
    }

    /// Registered names, sorted
    pub async fn list(&self) -> Vec<String> {
        let steps = self.steps.read().await;
        let mut names: Vec<String> = steps.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn count(&self) -> usize {
        self.steps.read().await.len()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
