//! Graph loader - YAML/JSON file loading and parsing
//!
//! This module handles loading graph definitions from files. `.json` files are
//! parsed as JSON, everything else as YAML (a superset of JSON).

use super::graph::GraphDefinition;
use crate::engine::FlowError;
use std::fs;
use std::path::Path;

/// Loads graph definitions from disk
pub struct GraphLoader;

impl GraphLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a graph definition from a file
    pub fn load_graph<P: AsRef<Path>>(&self, path: P) -> Result<GraphDefinition, FlowError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("Loaded graph file {}", path.display());

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::parse_json(&content)
        } else {
            Self::parse_yaml(&content)
        }
    }

    /// Parse a graph definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<GraphDefinition, FlowError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a graph definition from a JSON string
    pub fn parse_json(content: &str) -> Result<GraphDefinition, FlowError> {
        Ok(serde_json::from_str(content)?)
    }
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::workflow::graph::{EdgeDefinition, NodeKind};

    #[test]
    fn test_parse_yaml_graph() {
        let yaml = r#"
name: ReviewLoop
description: "Review until approved"
start_node: review
max_steps: 20

nodes:
  review:
    type: function
    function: reviewer
  publish:
    type: function
    function: publisher

edges:
  review:
    type: conditional
    condition: "approved == true"
    if_true: publish
    if_false: review
"#;
        let def = GraphLoader::parse_yaml(yaml).unwrap();
        assert_eq!(def.name, "ReviewLoop");
        assert_eq!(def.description.as_deref(), Some("Review until approved"));
        assert_eq!(def.max_steps, Some(20));
        assert_eq!(def.nodes["review"].kind, NodeKind::Function);
        assert_eq!(def.nodes["publish"].function.as_deref(), Some("publisher"));
        assert!(matches!(def.edges["review"], EdgeDefinition::Conditional(_)));
        assert!(!def.edges.contains_key("publish"));
    }

    #[test]
    fn test_parse_json_graph() {
        let json = r#"{
            "name": "Chain",
            "nodes": {"a": {"type": "function", "function": "f"}},
            "edges": {},
            "start_node": "a"
        }"#;
        let def = GraphLoader::parse_json(json).unwrap();
        assert_eq!(def.start_node, "a");
        assert!(def.edges.is_empty());
    }

    #[test]
    fn test_missing_start_node_field() {
        let result = GraphLoader::parse_yaml("name: x\nnodes: {}\n");
        assert!(matches!(result, Err(FlowError::Yaml(_))));
    }

    #[test]
    fn test_load_file_by_extension() {
        let dir = std::env::temp_dir().join(format!("quantumflow-loader-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let json_path = dir.join("graph.json");
        fs::write(
            &json_path,
            r#"{"name": "J", "nodes": {}, "start_node": "a"}"#,
        )
        .unwrap();
        let yaml_path = dir.join("graph.yaml");
        fs::write(&yaml_path, "name: Y\nnodes: {}\nstart_node: a\n").unwrap();

        let loader = GraphLoader::new();
        assert_eq!(loader.load_graph(&json_path).unwrap().name, "J");
        assert_eq!(loader.load_graph(&yaml_path).unwrap().name, "Y");
        assert!(matches!(
            loader.load_graph(dir.join("absent.yaml")),
            Err(FlowError::Io(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
