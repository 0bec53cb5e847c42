//! Graph workflow executor
//!
//! Walks a registered graph one node at a time: resolve the node, invoke its
//! step, merge the result into run state, follow the outgoing edge. Every run
//! ends as a `completed` or `failed` record; only an unknown graph id is
//! reported to the caller as an error.

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::config::DEFAULT_MAX_STEPS;
use crate::engine::{FlowError, StateMap, StepContext};
use crate::flow::workflow::registry::StepRegistry;
use crate::flow::workflow::run::{LogLevel, WorkflowRun};
use crate::flow::workflow::state::{StateStore, WorkflowState};

use super::compiled::Graph;
use super::types::{GraphDefinition, NodeConfig, NodeKind, END_NODE};

/// A run driven on its own task by [`GraphExecutor::spawn`]
pub struct RunHandle {
    pub run_id: String,
    pub handle: JoinHandle<WorkflowRun>,
}

/// Graph workflow executor
pub struct GraphExecutor {
    registry: StepRegistry,
    store: Arc<dyn StateStore>,
    max_steps: usize,
    /// Cancellation tokens of in-flight runs
    active: ActiveRuns,
}

type ActiveRuns = Arc<RwLock<HashMap<String, CancellationToken>>>;

impl GraphExecutor {
    pub fn new(registry: StepRegistry, store: Arc<dyn StateStore>) -> Self {
        Self {
            registry,
            store,
            max_steps: DEFAULT_MAX_STEPS,
            active: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Engine-wide step ceiling for graphs that don't set `max_steps`
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Compile and store a graph, returning its generated id.
    ///
    /// Malformed conditions are rejected. Dangling node references are only
    /// logged; they fail the run that reaches them.
    pub async fn register_graph(&self, definition: GraphDefinition) -> Result<String, FlowError> {
        let dangling = definition.dangling_references();
        if !dangling.is_empty() {
            log::warn!(
                "Graph '{}' references undefined nodes: {:?}",
                definition.name,
                dangling
            );
        }

        let graph = Graph::compile(definition)?;
        let graph_id = new_id("g");
        log::info!(
            "Registered graph '{}' as {} ({} nodes)",
            graph.name(),
            graph_id,
            graph.definition().nodes.len()
        );
        self.store.save_graph(&graph_id, Arc::new(graph)).await;
        Ok(graph_id)
    }

    pub async fn get_graph(&self, graph_id: &str) -> Result<Arc<Graph>, FlowError> {
        self.store
            .get_graph(graph_id)
            .await
            .ok_or_else(|| FlowError::GraphNotFound(graph_id.to_string()))
    }

    pub async fn get_run(&self, run_id: &str) -> Option<WorkflowRun> {
        self.store.get_run(run_id).await
    }

    /// Run a graph to completion.
    ///
    /// Fails only with `GraphNotFound`; every other failure is recorded in
    /// the returned run.
    pub async fn execute(
        &self,
        graph_id: &str,
        initial_state: StateMap,
    ) -> Result<WorkflowRun, FlowError> {
        self.execute_with_cancel(graph_id, initial_state, CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), stopping early once `cancel` fires
    pub async fn execute_with_cancel(
        &self,
        graph_id: &str,
        initial_state: StateMap,
        cancel: CancellationToken,
    ) -> Result<WorkflowRun, FlowError> {
        let (graph, run) = self.prepare(graph_id, initial_state, &cancel).await?;
        Ok(self.drive(&graph, run, &cancel).await)
    }

    /// Create and persist the run, then drive it on a background task.
    /// The returned id can be polled through [`get_run`](Self::get_run).
    pub async fn spawn(
        self: Arc<Self>,
        graph_id: &str,
        initial_state: StateMap,
    ) -> Result<RunHandle, FlowError> {
        let cancel = CancellationToken::new();
        let (graph, run) = self.prepare(graph_id, initial_state, &cancel).await?;
        let run_id = run.run_id.clone();

        let handle = tokio::spawn(async move { self.drive(&graph, run, &cancel).await });
        Ok(RunHandle { run_id, handle })
    }

    /// Cancel an in-flight run. Returns false if no such run is executing.
    pub async fn cancel(&self, run_id: &str) -> bool {
        match self.active.read().await.get(run_id) {
            Some(token) => {
                log::info!("Cancelling run {}", run_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn prepare(
        &self,
        graph_id: &str,
        initial_state: StateMap,
        cancel: &CancellationToken,
    ) -> Result<(Arc<Graph>, WorkflowRun), FlowError> {
        let graph = self.get_graph(graph_id).await?;
        let run = WorkflowRun::start(new_id("r"), graph_id.to_string(), initial_state);

        self.active
            .write()
            .await
            .insert(run.run_id.clone(), cancel.clone());
        self.store.save_run(&run).await;
        Ok((graph, run))
    }

    async fn drive(
        &self,
        graph: &Graph,
        run: WorkflowRun,
        cancel: &CancellationToken,
    ) -> WorkflowRun {
        let mut guard = DriveGuard {
            run,
            store: Arc::clone(&self.store),
            active: Arc::clone(&self.active),
            finished: false,
        };

        let outcome = self.walk(graph, &mut guard.run, cancel).await;
        self.active.write().await.remove(&guard.run.run_id);

        match outcome {
            Ok(()) => guard.run.complete(),
            Err(e) => guard.run.fail(e),
        }
        self.store.save_run(&guard.run).await;

        guard.finished = true;
        guard.run.clone()
    }

    async fn walk(
        &self,
        graph: &Graph,
        run: &mut WorkflowRun,
        cancel: &CancellationToken,
    ) -> Result<(), FlowError> {
        let max_steps = graph.max_steps(self.max_steps);
        let mut current = graph.start_node().to_string();

        while !is_end(&current) && run.steps < max_steps {
            if cancel.is_cancelled() {
                return Err(FlowError::Cancelled);
            }

            run.steps += 1;
            let message = format!("Step {}: Executing '{}'", run.steps, current);
            run.log(LogLevel::Info, message);

            let node = graph
                .node(&current)
                .ok_or_else(|| FlowError::NodeNotFound(current.clone()))?;
            let result = self
                .execute_node(&current, node, &run.state, &run.run_id, cancel)
                .await?;
            run.state.merge(result);

            let next = graph.next_node(&current, &run.state);
            if let Some(err) = &next.fallback {
                run.log(
                    LogLevel::Warning,
                    format!(
                        "Condition on '{}' could not be evaluated ({}), taking '{}'",
                        current, err, next.target
                    ),
                );
            }
            if !is_end(&next.target) {
                run.log(
                    LogLevel::Info,
                    format!("Transitioning to '{}'", next.target),
                );
            }
            current = next.target;

            self.store.save_run(run).await;
        }

        if !is_end(&current) {
            return Err(FlowError::StepLimitExceeded { limit: max_steps });
        }
        Ok(())
    }

    /// Execute a single node and return the fields to merge
    async fn execute_node(
        &self,
        name: &str,
        node: &NodeConfig,
        state: &WorkflowState,
        run_id: &str,
        cancel: &CancellationToken,
    ) -> Result<StateMap, FlowError> {
        if let NodeKind::Other(kind) = &node.kind {
            return Err(FlowError::UnsupportedNodeType {
                node: name.to_string(),
                kind: kind.clone(),
            });
        }

        let step_name = node
            .function
            .as_deref()
            .ok_or_else(|| FlowError::MissingFunction(name.to_string()))?;

        let step = match self.registry.get(step_name).await {
            Some(step) => step,
            None => {
                let available = self.registry.list().await;
                return Err(FlowError::tool_not_found(step_name, available));
            }
        };

        let ctx = StepContext {
            run_id: run_id.to_string(),
            node: name.to_string(),
            cancel: cancel.clone(),
        };
        let invocation = AssertUnwindSafe(step.invoke(state.as_map(), &ctx)).catch_unwind();

        tokio::select! {
            outcome = invocation => match outcome {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(FlowError::step_execution(name, step_name, e)),
                Err(_) => Err(FlowError::step_execution(name, step_name, "step panicked")),
            },
            _ = cancel.cancelled() => Err(FlowError::Cancelled),
        }
    }
}

/// Finalizes a run whose driving future is dropped before it returns, e.g.
/// an HTTP client disconnecting mid-run or a caller-side timeout.
struct DriveGuard {
    run: WorkflowRun,
    store: Arc<dyn StateStore>,
    active: ActiveRuns,
    finished: bool,
}

impl Drop for DriveGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let mut run = self.run.clone();
        if !run.is_terminal() {
            run.fail(FlowError::Cancelled);
        }
        let store = Arc::clone(&self.store);
        let active = Arc::clone(&self.active);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    active.write().await.remove(&run.run_id);
                    store.save_run(&run).await;
                });
            }
            Err(_) => log::warn!(
                "Run {} dropped outside a runtime; its record stays unfinalized",
                run.run_id
            ),
        }
    }
}

fn is_end(node: &str) -> bool {
    node.is_empty() || node == END_NODE
}

fn new_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &hex[..12])
}
