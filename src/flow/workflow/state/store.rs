// SPDX-License-Identifier: MIT

//! Storage for registered graphs and run records

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::flow::workflow::graph::Graph;
use crate::flow::workflow::run::WorkflowRun;

/// Keyed storage for graphs and runs.
///
/// Graph ids are prefixed `g-` and run ids `r-`; the two live in separate
/// namespaces. Each save/get is atomic per record, nothing more.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_graph(&self, graph_id: &str, graph: Arc<Graph>);
    async fn get_graph(&self, graph_id: &str) -> Option<Arc<Graph>>;
    async fn save_run(&self, run: &WorkflowRun);
    async fn get_run(&self, run_id: &str) -> Option<WorkflowRun>;
    async fn list_graphs(&self) -> Vec<String>;
    async fn list_runs(&self) -> Vec<String>;
}

/// In-memory store, shared by cloning the handle
#[derive(Clone, Default)]
pub struct MemoryStore {
    graphs: Arc<RwLock<HashMap<String, Arc<Graph>>>>,
    runs: Arc<RwLock<HashMap<String, WorkflowRun>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save_graph(&self, graph_id: &str, graph: Arc<Graph>) {
        let mut graphs = self.graphs.write().await;
        graphs.insert(graph_id.to_string(), graph);
    }

    async fn get_graph(&self, graph_id: &str) -> Option<Arc<Graph>> {
        let graphs = self.graphs.read().await;
        graphs.get(graph_id).cloned()
    }

    async fn save_run(&self, run: &WorkflowRun) {
        let mut runs = self.runs.write().await;
        runs.insert(run.run_id.clone(), run.clone());
    }

    async fn get_run(&self, run_id: &str) -> Option<WorkflowRun> {
        let runs = self.runs.read().await;
        runs.get(run_id).cloned()
    }

    async fn list_graphs(&self) -> Vec<String> {
        let graphs = self.graphs.read().await;
        let mut ids: Vec<String> = graphs.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn list_runs(&self) -> Vec<String> {
        let runs = self.runs.read().await;
        let mut ids: Vec<String> = runs.keys().cloned().collect();
        ids.sort();
        ids
    }
}
