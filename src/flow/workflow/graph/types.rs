//! Graph workflow type definitions
//!
//! This module defines the wire/file shape of a workflow graph: named nodes,
//! edges keyed by source node, and a start node.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Sentinel target meaning "terminate normally"
pub const END_NODE: &str = "end";

fn end_node() -> String {
    END_NODE.to_string()
}

fn conditional_kind() -> String {
    "conditional".to_string()
}

/// A workflow graph definition
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GraphDefinition {
    /// Name of the workflow
    pub name: String,
    /// Description of the workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nodes by name
    pub nodes: HashMap<String, NodeConfig>,
    /// Outgoing edge per source node; a node without one terminates the run
    #[serde(default)]
    pub edges: HashMap<String, EdgeDefinition>,
    /// Node executed first
    pub start_node: String,
    /// Overrides the engine-wide step ceiling for this graph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
}

/// A node in the workflow graph
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NodeConfig {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Step function name (for `function` nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Free-form settings, carried verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// Node type. Only `function` nodes execute; any other type is stored as-is
/// and fails the run if reached.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Function,
    Other(String),
}

/// Transition out of a node
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum EdgeDefinition {
    /// Always go to the named node
    Direct(String),
    /// Pick a target by evaluating a condition against state
    Conditional(ConditionalEdge),
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ConditionalEdge {
    #[serde(rename = "type", default = "conditional_kind")]
    pub kind: String,
    pub condition: String,
    #[serde(default = "end_node")]
    pub if_true: String,
    #[serde(default = "end_node")]
    pub if_false: String,
}

impl GraphDefinition {
    pub fn new(name: impl Into<String>, start_node: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            start_node: start_node.into(),
            max_steps: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a `function` node bound to `step`
    pub fn function_node(mut self, name: impl Into<String>, step: impl Into<String>) -> Self {
        self.nodes.insert(name.into(), NodeConfig::function(step));
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges
            .insert(from.into(), EdgeDefinition::Direct(to.into()));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        condition: impl Into<String>,
        if_true: impl Into<String>,
        if_false: impl Into<String>,
    ) -> Self {
        self.edges.insert(
            from.into(),
            EdgeDefinition::Conditional(ConditionalEdge {
                kind: conditional_kind(),
                condition: condition.into(),
                if_true: if_true.into(),
                if_false: if_false.into(),
            }),
        );
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Node names referenced by the start node or an edge but not defined.
    /// Sorted and deduplicated.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut referenced: Vec<&str> = vec![self.start_node.as_str()];
        for (from, edge) in &self.edges {
            referenced.push(from);
            match edge {
                EdgeDefinition::Direct(to) => referenced.push(to),
                EdgeDefinition::Conditional(c) => {
                    referenced.push(&c.if_true);
                    referenced.push(&c.if_false);
                }
            }
        }

        let mut missing: Vec<String> = referenced
            .into_iter()
            .filter(|name| *name != END_NODE && !self.nodes.contains_key(*name))
            .map(str::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

impl NodeConfig {
    pub fn function(step: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Function,
            function: Some(step.into()),
            config: None,
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "function" => NodeKind::Function,
            _ => NodeKind::Other(s),
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Function => "function".to_string(),
            NodeKind::Other(s) => s,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Function => write!(f, "function"),
            NodeKind::Other(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_graph_json() {
        let graph: GraphDefinition = serde_json::from_value(json!({
            "name": "CodePrism",
            "nodes": {
                "extract": {"type": "function", "function": "function_extractor"},
                "checkpoint": {"type": "function", "function": "quality_checkpoint"}
            },
            "edges": {
                "extract": "checkpoint",
                "checkpoint": {
                    "type": "conditional",
                    "condition": "stop == True",
                    "if_true": "end",
                    "if_false": "extract"
                }
            },
            "start_node": "extract"
        }))
        .unwrap();

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(
            graph.edges["extract"],
            EdgeDefinition::Direct("checkpoint".to_string())
        );
        match &graph.edges["checkpoint"] {
            EdgeDefinition::Conditional(c) => {
                assert_eq!(c.condition, "stop == True");
                assert_eq!(c.if_false, "extract");
            }
            other => panic!("expected conditional edge, got {:?}", other),
        }
        assert_eq!(graph.max_steps, None);
    }

    #[test]
    fn test_conditional_targets_default_to_end() {
        let edge: EdgeDefinition = serde_json::from_value(json!({"condition": "done"})).unwrap();
        assert_eq!(
            edge,
            EdgeDefinition::Conditional(ConditionalEdge {
                kind: "conditional".to_string(),
                condition: "done".to_string(),
                if_true: "end".to_string(),
                if_false: "end".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_node_type_is_preserved() {
        let node: NodeConfig = serde_json::from_value(json!({"type": "condition"})).unwrap();
        assert_eq!(node.kind, NodeKind::Other("condition".to_string()));
        assert_eq!(serde_json::to_value(&node).unwrap(), json!({"type": "condition"}));
    }

    #[test]
    fn test_dangling_references() {
        let graph = GraphDefinition::new("g", "start")
            .function_node("a", "f")
            .edge("a", "b")
            .conditional_edge("a2", "x", "end", "a");

        assert_eq!(graph.dangling_references(), vec!["a2", "b", "start"]);
    }

    #[test]
    fn test_builder_round_trips_through_yaml() {
        let graph = GraphDefinition::new("chain", "a")
            .with_description("two steps")
            .function_node("a", "f")
            .function_node("b", "g")
            .edge("a", "b")
            .with_max_steps(10);

        let yaml = serde_yaml::to_string(&graph).unwrap();
        let back: GraphDefinition = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, graph);
    }
}
