// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! This module provides the graph model and the executor that walks it one
//! node at a time.

mod compiled;
pub mod executor;
pub mod types;

pub use compiled::{Graph, NextNode};
pub use executor::{GraphExecutor, RunHandle};
pub use types::{ConditionalEdge, EdgeDefinition, GraphDefinition, NodeConfig, NodeKind, END_NODE};
