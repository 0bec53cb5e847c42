//! Condition expression evaluator
//!
//! Evaluation only ever reads workflow state; nothing else is reachable from
//! an expression.

use super::ast::{CompareOp, Expression, Literal, Operand};
use super::ConditionError;
use crate::flow::workflow::state::WorkflowState;
use serde_json::Value;

/// Evaluate a condition expression against workflow state.
///
/// `and`/`or` short-circuit, so `x != null and x > 3` never touches `x` when it
/// is absent.
pub fn evaluate(expr: &Expression, state: &WorkflowState) -> Result<bool, ConditionError> {
    match expr {
        Expression::Compare { left, op, right } => evaluate_compare(left, *op, right, state),
        Expression::Truthy(operand) => Ok(is_truthy(&resolve(operand, state)?)),
        Expression::And(left, right) => Ok(evaluate(left, state)? && evaluate(right, state)?),
        Expression::Or(left, right) => Ok(evaluate(left, state)? || evaluate(right, state)?),
        Expression::Not(inner) => Ok(!evaluate(inner, state)?),
    }
}

fn resolve(operand: &Operand, state: &WorkflowState) -> Result<Value, ConditionError> {
    match operand {
        Operand::Literal(lit) => Ok(literal_value(lit)),
        Operand::Path(path) => state
            .get_path(path)
            .cloned()
            .ok_or_else(|| ConditionError::UndefinedName(path.clone())),
    }
}

/// Like `resolve`, but a missing path reads as null
fn resolve_or_null(operand: &Operand, state: &WorkflowState) -> Result<Value, ConditionError> {
    match resolve(operand, state) {
        Err(ConditionError::UndefinedName(_)) => Ok(Value::Null),
        other => other,
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn is_null_literal(operand: &Operand) -> bool {
    matches!(operand, Operand::Literal(Literal::Null))
}

fn evaluate_compare(
    left: &Operand,
    op: CompareOp,
    right: &Operand,
    state: &WorkflowState,
) -> Result<bool, ConditionError> {
    match op {
        CompareOp::Eq | CompareOp::NotEq => {
            let null_check = is_null_literal(left) || is_null_literal(right);
            let (l, r) = if null_check {
                (
                    resolve_or_null(left, state)?,
                    resolve_or_null(right, state)?,
                )
            } else {
                (resolve(left, state)?, resolve(right, state)?)
            };
            let equal = values_equal(&l, &r);
            Ok(if op == CompareOp::Eq { equal } else { !equal })
        }
        op if op.is_ordering() => {
            let l = resolve(left, state)?;
            let r = resolve(right, state)?;
            let (a, b) = match (as_number(&l), as_number(&r)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(ConditionError::type_mismatch(op, &l, &r)),
            };
            Ok(match op {
                CompareOp::Gt => a > b,
                CompareOp::Gte => a >= b,
                CompareOp::Lt => a < b,
                _ => a <= b,
            })
        }
        _ => {
            let l = resolve(left, state)?;
            let r = resolve(right, state)?;
            check_contains(&l, &r).ok_or_else(|| ConditionError::type_mismatch(op, &l, &r))
        }
    }
}

/// Numeric view of a value: numbers by value, booleans as 0/1
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Equality used by `==`, `!=` and array `contains`.
///
/// Two numeric operands (numbers, or booleans as 0/1, the same view the
/// ordering operators use) compare exactly by value, so `1 == 1.0` and
/// `True == 1` hold. Everything else compares structurally, so `1 == '1'`
/// is false.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn check_contains(haystack: &Value, needle: &Value) -> Option<bool> {
    match (haystack, needle) {
        (Value::String(s), Value::String(sub)) => Some(s.contains(sub.as_str())),
        (Value::Array(items), _) => Some(items.iter().any(|v| values_equal(v, needle))),
        (Value::Object(map), Value::String(key)) => Some(map.contains_key(key)),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::workflow::condition::parser::parse;
    use serde_json::json;

    fn state_with(pairs: Vec<(&str, Value)>) -> WorkflowState {
        let mut state = WorkflowState::empty();
        for (k, v) in pairs {
            state.update(k, v);
        }
        state
    }

    fn eval(src: &str, state: &WorkflowState) -> Result<bool, ConditionError> {
        evaluate(&parse(src).unwrap(), state)
    }

    #[test]
    fn test_string_equality() {
        let state = state_with(vec![("intent", json!("search"))]);
        assert!(eval("intent == 'search'", &state).unwrap());
        assert!(!eval("intent == 'code'", &state).unwrap());
        assert!(eval("intent != 'code'", &state).unwrap());
    }

    #[test]
    fn test_boolean_flag() {
        let state = state_with(vec![("stop", json!(true))]);
        assert!(eval("stop == True", &state).unwrap());
        assert!(eval("stop", &state).unwrap());
        assert!(!eval("not stop", &state).unwrap());
    }

    #[test]
    fn test_number_comparison() {
        let state = state_with(vec![("score", json!(75)), ("threshold", json!(70))]);

        assert!(eval("score > 5", &state).unwrap());
        assert!(eval("score >= 75", &state).unwrap());
        assert!(!eval("score < 75", &state).unwrap());
        assert!(eval("score <= 75.0", &state).unwrap());
        assert!(eval("score >= threshold", &state).unwrap());
        assert!(eval("score == 75.0", &state).unwrap());
    }

    #[test]
    fn test_missing_name_is_error() {
        let state = WorkflowState::empty();
        assert!(matches!(
            eval("stop == True", &state),
            Err(ConditionError::UndefinedName(name)) if name == "stop"
        ));
        assert!(eval("stop", &state).is_err());
    }

    #[test]
    fn test_missing_name_equals_null() {
        let state = WorkflowState::empty();
        assert!(eval("error == null", &state).unwrap());
        assert!(!eval("error != None", &state).unwrap());
    }

    #[test]
    fn test_ordering_type_mismatch() {
        let state = state_with(vec![("label", json!("high"))]);
        assert!(matches!(
            eval("label > 3", &state),
            Err(ConditionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_mismatched_equality_is_false() {
        let state = state_with(vec![("count", json!(1))]);
        assert!(!eval("count == '1'", &state).unwrap());
    }

    #[test]
    fn test_numeric_equality_matches_ordering() {
        let state = state_with(vec![
            ("flag", json!(true)),
            ("off", json!(false)),
            ("ratio", json!(0.3)),
            ("count", json!(2)),
        ]);

        assert!(eval("flag == 1", &state).unwrap());
        assert!(eval("flag >= 1", &state).unwrap());
        assert!(eval("off == 0", &state).unwrap());
        assert!(eval("count == 2.0", &state).unwrap());
        assert!(eval("ratio == 0.3", &state).unwrap());
        assert!(!eval("ratio == 0.30000000000000004", &state).unwrap());
        assert!(!eval("flag == 'True'", &state).unwrap());
    }

    #[test]
    fn test_contains() {
        let state = state_with(vec![
            ("message", json!("hello world")),
            ("tags", json!(["bug", "urgent"])),
            ("meta", json!({"owner": "ops"})),
        ]);

        assert!(eval("message contains 'world'", &state).unwrap());
        assert!(!eval("message contains 'foo'", &state).unwrap());
        assert!(eval("tags contains 'bug'", &state).unwrap());
        assert!(!eval("tags contains 'frontend'", &state).unwrap());
        assert!(eval("meta contains 'owner'", &state).unwrap());
        assert!(eval("message contains 3", &state).is_err());
    }

    #[test]
    fn test_short_circuit_guards_missing_name() {
        let state = WorkflowState::empty();
        assert!(!eval("x != null and x > 3", &state).unwrap());
        assert!(eval("x == null or x > 3", &state).unwrap());
    }

    #[test]
    fn test_nested_path() {
        let state = state_with(vec![("result", json!({"data": {"intent": "search"}}))]);
        assert!(eval("result.data.intent == 'search'", &state).unwrap());
        assert!(eval("result.data.other == null", &state).unwrap());
    }

    #[test]
    fn test_truthiness() {
        let state = state_with(vec![
            ("zero", json!(0)),
            ("empty", json!("")),
            ("items", json!([1])),
            ("nothing", json!(null)),
        ]);
        assert!(!eval("zero", &state).unwrap());
        assert!(!eval("empty", &state).unwrap());
        assert!(eval("items", &state).unwrap());
        assert!(!eval("nothing", &state).unwrap());
    }
}
