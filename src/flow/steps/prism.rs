// SPDX-License-Identifier: MIT

//! Code Prism: a code-review workflow
//!
//! Four synchronous steps wired into a loop:
//! extract → analyze → suggest → checkpoint, and back to extract until the
//! quality score reaches the threshold or the iteration budget runs out.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::engine::{FlowError, StateMap, StepError};
use crate::flow::workflow::graph::{GraphDefinition, END_NODE};
use crate::flow::workflow::registry::StepRegistry;

pub const FUNCTION_EXTRACTOR: &str = "function_extractor";
pub const COMPLEXITY_ANALYZER: &str = "complexity_analyzer";
pub const IMPROVEMENT_SUGGESTER: &str = "improvement_suggester";
pub const QUALITY_CHECKPOINT: &str = "quality_checkpoint";

pub const DEFAULT_THRESHOLD: i64 = 70;
pub const DEFAULT_MAX_ITERATIONS: i64 = 3;

static FUNCTION_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"def\s+(\w+)\s*\([^)]*\):").expect("function pattern is valid")
});

/// Register all four Code Prism steps
pub async fn register_prism_steps(registry: &StepRegistry) -> Result<(), FlowError> {
    registry.register_fn(FUNCTION_EXTRACTOR, function_extractor).await?;
    registry.register_fn(COMPLEXITY_ANALYZER, complexity_analyzer).await?;
    registry
        .register_fn(IMPROVEMENT_SUGGESTER, improvement_suggester)
        .await?;
    registry.register_fn(QUALITY_CHECKPOINT, quality_checkpoint).await?;
    Ok(())
}

/// The review loop graph
pub fn prism_graph() -> GraphDefinition {
    GraphDefinition::new("CodePrism", "extract")
        .with_description("Iterative code review")
        .function_node("extract", FUNCTION_EXTRACTOR)
        .function_node("analyze", COMPLEXITY_ANALYZER)
        .function_node("suggest", IMPROVEMENT_SUGGESTER)
        .function_node("checkpoint", QUALITY_CHECKPOINT)
        .edge("extract", "analyze")
        .edge("analyze", "suggest")
        .edge("suggest", "checkpoint")
        .conditional_edge("checkpoint", "stop == True", END_NODE, "extract")
}

/// Initial state for a review of `code`
pub fn initial_state(code: &str, threshold: i64, max_iterations: i64) -> StateMap {
    into_map(json!({
        "code": code,
        "threshold": threshold,
        "max_iterations": max_iterations,
        "iteration": 0,
        "quality_score": 0,
    }))
}

/// Find `def name(...):` blocks and measure them
pub fn function_extractor(state: &StateMap) -> Result<StateMap, StepError> {
    let code = code_of(state)?;

    let mut functions = Vec::new();
    for caps in FUNCTION_DEF.captures_iter(code) {
        let name = &caps[1];
        let Some(start) = code.find(&format!("def {}", name)) else {
            continue;
        };

        let mut lines = code[start..].split('\n');
        let mut body: Vec<&str> = lines.next().into_iter().collect();
        for line in lines {
            if !line.is_empty() && !line.starts_with([' ', '\t']) {
                break;
            }
            body.push(line);
        }

        functions.push(json!({
            "name": name,
            "lines": body.len(),
            "body": body.join("\n"),
        }));
    }

    let count = functions.len();
    Ok(into_map(json!({
        "functions": functions,
        "function_count": count,
        "extraction_complete": true,
    })))
}

/// Score the code from 0 to 100 and list the issues found
pub fn complexity_analyzer(state: &StateMap) -> Result<StateMap, StepError> {
    let functions = array_of(state, "functions");
    let code = code_of(state)?;

    let mut score: i64 = 50;
    let mut issues: Vec<String> = Vec::new();

    match functions.len() {
        0 => {
            score -= 20;
            issues.push("No functions detected".to_string());
        }
        n if n > 5 => {
            score -= 5;
            issues.push(format!("Too many functions ({})", n));
        }
        n if n >= 2 => score += 20,
        _ => {}
    }

    for func in functions {
        let lines = func.get("lines").and_then(Value::as_i64).unwrap_or(0);
        if lines > 20 {
            score -= 10;
            let name = func.get("name").and_then(Value::as_str).unwrap_or("?");
            issues.push(format!("Function '{}' exceeds 20 lines", name));
        } else if lines < 10 {
            score += 10;
        }
    }

    if code.chars().count() > 500 {
        score -= 10;
        issues.push("Code is excessively long".to_string());
    }

    Ok(into_map(json!({
        "quality_score": score.clamp(0, 100),
        "issues": issues,
        "complexity_check_complete": true,
    })))
}

/// Turn issues into suggestions and bump the iteration counter.
///
/// Each pass credits 15 points to the score, capped at 100.
pub fn improvement_suggester(state: &StateMap) -> Result<StateMap, StepError> {
    let issues: Vec<&str> = array_of(state, "issues")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    let functions = array_of(state, "functions");
    let quality_score = int_of(state, "quality_score", 0);

    let mut suggestions: Vec<String> = Vec::new();

    if issues.iter().any(|i| i.contains("No functions detected")) {
        suggestions.push("Refactor code into modular functions".to_string());
    }

    for issue in &issues {
        if issue.to_lowercase().contains("exceeds") {
            suggestions.push("Break down large functions into smaller units".to_string());
        }
        if issue.contains("Too many functions") {
            suggestions.push("Consider class-based organization".to_string());
        }
    }

    for func in functions {
        let body = func.get("body").and_then(Value::as_str).unwrap_or("");
        if !body.to_lowercase().contains("return") {
            let name = func.get("name").and_then(Value::as_str).unwrap_or("?");
            suggestions.push(format!("Add explicit return statement to '{}'", name));
        }
    }

    if quality_score < 70 {
        suggestions.extend(
            [
                "Add comprehensive docstrings",
                "Implement type hints for parameters",
                "Review variable naming conventions",
            ]
            .map(String::from),
        );
    }

    Ok(into_map(json!({
        "suggestions": suggestions,
        "iteration": int_of(state, "iteration", 0) + 1,
        "quality_score": (quality_score + 15).min(100),
        "suggestion_complete": true,
    })))
}

/// Decide whether the review loop stops
pub fn quality_checkpoint(state: &StateMap) -> Result<StateMap, StepError> {
    let quality_score = int_of(state, "quality_score", 0);
    let threshold = int_of(state, "threshold", DEFAULT_THRESHOLD);
    let iteration = int_of(state, "iteration", 0);
    let max_iterations = int_of(state, "max_iterations", DEFAULT_MAX_ITERATIONS);

    let stop = quality_score >= threshold || iteration >= max_iterations;
    Ok(into_map(json!({
        "stop": stop,
        "checkpoint_passed": stop,
    })))
}

fn code_of(state: &StateMap) -> Result<&str, StepError> {
    match state.get("code") {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!("'code' must be a string, got {}", other).into()),
    }
}

fn array_of<'a>(state: &'a StateMap, key: &str) -> &'a [Value] {
    state
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn int_of(state: &StateMap, key: &str, default: i64) -> i64 {
    state
        .get(key)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(default)
}

fn into_map(value: Value) -> StateMap {
    match value {
        Value::Object(map) => map,
        _ => StateMap::new(),
    }
}
