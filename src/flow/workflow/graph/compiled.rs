// SPDX-License-Identifier: MIT

//! Registered graphs with their edge conditions parsed

use std::collections::HashMap;

use crate::engine::FlowError;
use crate::flow::workflow::condition::{self, ConditionError, Expression};
use crate::flow::workflow::state::WorkflowState;

use super::types::{EdgeDefinition, GraphDefinition, NodeConfig, END_NODE};

/// Outgoing transition of a node after compilation
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Direct(String),
    Conditional {
        source: String,
        expr: Expression,
        if_true: String,
        if_false: String,
    },
}

/// Where execution goes after a node
#[derive(Debug, Clone, PartialEq)]
pub struct NextNode {
    pub target: String,
    /// Set when a condition failed to evaluate and the false branch was taken
    pub fallback: Option<ConditionError>,
}

/// A graph accepted by the store: immutable, conditions pre-parsed.
#[derive(Debug, Clone)]
pub struct Graph {
    definition: GraphDefinition,
    transitions: HashMap<String, Transition>,
}

impl Graph {
    /// Parse every conditional edge, rejecting unsupported syntax and a zero
    /// step ceiling.
    ///
    /// Node references are not checked here; a missing node surfaces as
    /// `NodeNotFound` when a run reaches it.
    pub fn compile(definition: GraphDefinition) -> Result<Self, FlowError> {
        if definition.max_steps == Some(0) {
            return Err(FlowError::InvalidGraph {
                name: definition.name.clone(),
                message: "max_steps must be at least 1".to_string(),
            });
        }

        let mut transitions = HashMap::with_capacity(definition.edges.len());

        for (from, edge) in &definition.edges {
            let transition = match edge {
                EdgeDefinition::Direct(to) => Transition::Direct(to.clone()),
                EdgeDefinition::Conditional(c) => {
                    let expr = condition::parse(&c.condition).map_err(|source| {
                        FlowError::InvalidCondition {
                            source_node: from.clone(),
                            source,
                        }
                    })?;
                    log::debug!(
                        "Edge from '{}' reads state keys {:?}",
                        from,
                        expr.paths()
                    );
                    Transition::Conditional {
                        source: c.condition.clone(),
                        expr,
                        if_true: c.if_true.clone(),
                        if_false: c.if_false.clone(),
                    }
                }
            };
            transitions.insert(from.clone(), transition);
        }

        Ok(Self {
            definition,
            transitions,
        })
    }

    pub fn definition(&self) -> &GraphDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn start_node(&self) -> &str {
        &self.definition.start_node
    }

    pub fn node(&self, name: &str) -> Option<&NodeConfig> {
        self.definition.nodes.get(name)
    }

    /// Step ceiling for runs of this graph
    pub fn max_steps(&self, default: usize) -> usize {
        self.definition.max_steps.unwrap_or(default)
    }

    /// Resolve the node that follows `current` given the post-merge state.
    ///
    /// No edge means `end`. A condition that fails to evaluate takes the
    /// false branch.
    pub fn next_node(&self, current: &str, state: &WorkflowState) -> NextNode {
        match self.transitions.get(current) {
            None => NextNode {
                target: END_NODE.to_string(),
                fallback: None,
            },
            Some(Transition::Direct(to)) => NextNode {
                target: to.clone(),
                fallback: None,
            },
            Some(Transition::Conditional {
                source,
                expr,
                if_true,
                if_false,
            }) => match condition::evaluate(expr, state) {
                Ok(true) => NextNode {
                    target: if_true.clone(),
                    fallback: None,
                },
                Ok(false) => NextNode {
                    target: if_false.clone(),
                    fallback: None,
                },
                Err(e) => {
                    log::warn!(
                        "Condition '{}' on '{}' failed ({}), taking '{}'",
                        source,
                        current,
                        e,
                        if_false
                    );
                    NextNode {
                        target: if_false.clone(),
                        fallback: Some(e),
                    }
                }
            },
        }
    }
}
