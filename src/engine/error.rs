// SPDX-License-Identifier: MIT

//! Typed error handling for quantumflow
//!
//! Every failure the engine can raise is a `FlowError`. Inside a run these are
//! absorbed into a failed `WorkflowRun`; outside a run (registration, lookups)
//! they propagate to the caller.

use thiserror::Error;

use crate::flow::workflow::condition::ConditionError;

/// Boxed error returned by step functions
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for quantumflow
#[derive(Debug, Error)]
pub enum FlowError {
    /// No graph is stored under the given id
    #[error("Graph '{0}' not found")]
    GraphNotFound(String),

    /// No run is stored under the given id
    #[error("Run '{0}' not found")]
    RunNotFound(String),

    /// A node name (start node or edge target) does not exist in the graph
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    /// A node references a step name the registry cannot resolve
    #[error("Tool '{name}' not found. Available: {available:?}")]
    ToolNotFound { name: String, available: Vec<String> },

    /// Loop detection tripped
    #[error("Maximum steps ({limit}) reached - possible infinite loop")]
    StepLimitExceeded { limit: usize },

    /// A step function returned an error
    #[error("Step '{step}' failed at node '{node}': {message}")]
    StepExecution {
        node: String,
        step: String,
        message: String,
    },

    /// A step name was registered twice
    #[error("Tool '{0}' is already registered")]
    DuplicateStep(String),

    /// A conditional edge expression could not be compiled
    #[error("Invalid condition on edge from '{source_node}': {source}")]
    InvalidCondition {
        source_node: String,
        #[source]
        source: ConditionError,
    },

    /// A graph definition that can never run, such as `max_steps: 0`
    #[error("Invalid graph '{name}': {message}")]
    InvalidGraph { name: String, message: String },

    /// A function node without a function name
    #[error("Function name not specified for node '{0}'")]
    MissingFunction(String),

    /// A node type the executor does not implement
    #[error("Unknown node type '{kind}' for node '{node}'")]
    UnsupportedNodeType { node: String, kind: String },

    /// The run was cancelled through its token
    #[error("Run cancelled")]
    Cancelled,

    /// Configuration errors (invalid env vars, bad flags)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl FlowError {
    /// Create a tool not found error
    pub fn tool_not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        Self::ToolNotFound {
            name: name.into(),
            available,
        }
    }

    /// Create a step execution error from whatever the step returned
    pub fn step_execution(
        node: impl Into<String>,
        step: impl Into<String>,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::StepExecution {
            node: node.into(),
            step: step.into(),
            message: err.to_string(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
